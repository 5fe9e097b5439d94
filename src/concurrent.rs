use std::sync::Arc;

use futures::{future::LocalBoxFuture, stream::FuturesOrdered, FutureExt, StreamExt};
use itertools::Itertools;
use log::info;
use parking_lot::RwLock;

use crate::provider::{Instance, InstanceProvider, RegionId};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Runs per-region instance listings with a bounded number in flight.
/// Results come back in the order the regions were spawned.
pub struct ConcurrentLoader<'a> {
    tasks: FuturesOrdered<LocalBoxFuture<'a, LoadedRegion>>,
    counter: Arc<RwLock<usize>>,
    results: Vec<LoadedRegion>,
    expected_results: usize,
    max_in_flight: usize,
}

impl<'a> ConcurrentLoader<'a> {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            tasks: FuturesOrdered::new(),
            counter: Arc::new(RwLock::new(0)),
            results: vec![],
            expected_results: 0,
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub async fn spawn_region_loader<P>(&mut self, provider: &'a P, region: RegionId)
    where
        P: InstanceProvider + Sync + ?Sized,
    {
        info!("scanning ec2@{}", region);
        self.spawn_concurrently(
            async move {
                let instances = provider.list_instances(&region).await?;
                Ok::<_, anyhow::Error>(RegionInstances { region, instances })
            }
            .boxed_local(),
        )
        .await;
    }

    pub async fn spawn_concurrently(&mut self, f: LocalBoxFuture<'a, LoadedRegion>) {
        if *self.counter.read() >= self.max_in_flight {
            if let Some(result) = self.tasks.next().await {
                self.results.push(result);
            }
        }

        let counter = self.counter.clone();
        *counter.write() += 1;
        self.expected_results += 1;

        self.tasks.push_back(Box::pin(async move {
            let result = f.await;
            *counter.write() -= 1;
            result
        }));
    }

    /// Waits for every listing and returns them in spawn order, or the first failure.
    pub async fn collect(self) -> anyhow::Result<Vec<RegionInstances>> {
        let results = itertools::chain(self.results, self.tasks.collect::<Vec<_>>().await)
            .collect_vec();
        assert_eq!(results.len(), self.expected_results);
        assert_eq!(*self.counter.read(), 0);
        results.into_iter().collect()
    }
}

pub type LoadedRegion = anyhow::Result<RegionInstances>;

#[derive(Debug)]
pub struct RegionInstances {
    pub region: RegionId,
    pub instances: Vec<Instance>,
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use futures::{future::LocalBoxFuture, FutureExt};
    use itertools::Itertools;

    use super::{ConcurrentLoader, LoadedRegion, RegionInstances, DEFAULT_CONCURRENCY};

    fn delayed(region: &str, millis: u64) -> LocalBoxFuture<'static, LoadedRegion> {
        let region = region.to_string();
        async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(RegionInstances {
                region,
                instances: vec![],
            })
        }
        .boxed_local()
    }

    #[tokio::test]
    async fn test_collect_keeps_spawn_order() {
        let mut loader = ConcurrentLoader::new(2);
        loader.spawn_concurrently(delayed("a", 30)).await;
        loader.spawn_concurrently(delayed("b", 1)).await;
        loader.spawn_concurrently(delayed("c", 10)).await;
        loader.spawn_concurrently(delayed("d", 1)).await;
        let regions = loader
            .collect()
            .await
            .unwrap()
            .into_iter()
            .map(|loaded| loaded.region)
            .collect_vec();
        assert_eq!(regions, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_collect_empty() {
        let loader = ConcurrentLoader::new(DEFAULT_CONCURRENCY);
        assert!(loader.collect().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collect_fails_on_any_error() {
        let mut loader = ConcurrentLoader::new(1);
        loader.spawn_concurrently(delayed("a", 1)).await;
        loader
            .spawn_concurrently(
                async { Err::<RegionInstances, _>(anyhow::anyhow!("throttled")) }.boxed_local(),
            )
            .await;
        loader.spawn_concurrently(delayed("c", 1)).await;
        let err = loader.collect().await.unwrap_err();
        assert_eq!(err.to_string(), "throttled");
    }
}
