//! Standalone extractors: plugins that query the live system instead of
//! consuming filesystem walk output.

pub mod os_release;

use async_trait::async_trait;
use futures::future::join_all;

use crate::context::ScanContext;
use crate::model::Inventory;
use crate::plugin::{Capabilities, Plugin};

/// A plugin that produces inventory without participating in the walk.
#[async_trait]
pub trait StandaloneExtractor: Plugin {
    /// Runs the extraction once per scan.
    async fn extract(&self, ctx: &ScanContext) -> anyhow::Result<Vec<Inventory>>;
}

impl Plugin for Box<dyn StandaloneExtractor> {
    fn name(&self) -> &'static str {
        self.as_ref().name()
    }
    fn version(&self) -> i32 {
        self.as_ref().version()
    }
    fn requirements(&self) -> Capabilities {
        self.as_ref().requirements()
    }
}

/// Outcome of one standalone extractor, merged by the engine in
/// configuration order.
pub(crate) struct StandaloneOutcome {
    pub name: &'static str,
    pub version: i32,
    pub result: anyhow::Result<Vec<Inventory>>,
}

/// Runs every standalone extractor concurrently and returns their outcomes
/// in configuration order. Extractors whose context is already cancelled are
/// not started.
pub(crate) async fn run_standalone(
    ctx: &ScanContext,
    extractors: &[Box<dyn StandaloneExtractor>],
) -> Vec<StandaloneOutcome> {
    let futures: Vec<_> = extractors
        .iter()
        .map(|ex| async move {
            let result = match ctx.check() {
                Ok(()) => ex.extract(ctx).await,
                Err(err) => Err(anyhow::Error::new(err)),
            };
            StandaloneOutcome {
                name: ex.as_ref().name(),
                version: ex.as_ref().version(),
                result,
            }
        })
        .collect();

    join_all(futures).await
}

/// Returns every standalone extractor known to this build.
pub fn all_standalone_extractors() -> Vec<Box<dyn StandaloneExtractor>> {
    vec![Box::new(os_release::OsReleaseExtractor::default())]
}

/// Looks up one standalone extractor by its stable name.
pub fn standalone_extractor_from_name(name: &str) -> Option<Box<dyn StandaloneExtractor>> {
    all_standalone_extractors()
        .into_iter()
        .find(|e| e.as_ref().name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;

    struct Fixed(&'static str);

    impl Plugin for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }
        fn version(&self) -> i32 {
            0
        }
        fn requirements(&self) -> Capabilities {
            Capabilities::default()
        }
    }

    #[async_trait]
    impl StandaloneExtractor for Fixed {
        async fn extract(&self, _ctx: &ScanContext) -> anyhow::Result<Vec<Inventory>> {
            Ok(vec![Inventory::new(self.0, None::<String>, ["live"])])
        }
    }

    #[tokio::test]
    async fn test_outcomes_keep_configuration_order() {
        let extractors: Vec<Box<dyn StandaloneExtractor>> =
            vec![Box::new(Fixed("b")), Box::new(Fixed("a"))];
        let outcomes = run_standalone(&ScanContext::new(), &extractors).await;
        let names: Vec<_> = outcomes.iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_extractors() {
        let extractors: Vec<Box<dyn StandaloneExtractor>> = vec![Box::new(Fixed("a"))];
        let ctx = ScanContext::new();
        ctx.cancel();
        let outcomes = run_standalone(&ctx, &extractors).await;
        let err = outcomes[0].result.as_ref().unwrap_err();
        assert!(err.downcast_ref::<ScanError>().is_some());
    }
}
