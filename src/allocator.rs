//! Picks webhook suffixes that no registered webhook uses yet.

use std::collections::HashSet;

use rand::seq::IndexedRandom;

use crate::{
    error::{HookError, HookResult},
    names::NameSource,
    registry::Webhook,
};

const SEPARATOR: &str = "_";

/// Lower-cases `name` and joins its words with `_`, giving a URL-safe path segment.
pub fn normalize(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// The normalized names of `webhooks`.
pub fn used_names<'a>(webhooks: impl IntoIterator<Item = &'a Webhook>) -> HashSet<String> {
    webhooks.into_iter().map(|webhook| normalize(&webhook.name)).collect()
}

#[derive(Debug, Clone)]
pub struct Allocator<S> {
    source: S,
    max_attempts: usize,
}

impl<S: NameSource> Allocator<S> {
    pub fn new(source: S, max_attempts: usize) -> Self {
        Self {
            source,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Draws an unused name from the source's pool.
    ///
    /// Only source failures are retried: at most `max_attempts` fetches are made, and if none of them
    /// yields a non-empty pool this fails with `SourceUnavailable`. A pool that lies entirely inside
    /// `used` fails with `PoolExhausted`.
    pub async fn allocate(&self, used: &HashSet<String>) -> HookResult<String> {
        for attempt in 1..=self.max_attempts {
            let pool = match self.source.candidates().await {
                Ok(pool) if !pool.is_empty() => pool,
                Ok(_) => {
                    tracing::warn!(attempt, "name source returned an empty pool");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(attempt, %err, "name source draw failed");
                    continue;
                }
            };

            let unused: Vec<String> = pool
                .iter()
                .map(|name| normalize(name))
                .filter(|name| !used.contains(name))
                .collect();
            let Some(candidate) = unused.choose(&mut rand::rng()).cloned() else {
                return Err(HookError::PoolExhausted { attempts: attempt });
            };
            tracing::debug!(attempt, %candidate, "allocated suffix");
            return Ok(candidate);
        }

        Err(HookError::SourceUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::error::{Service, UpstreamStatus};

    struct Pool(Vec<&'static str>);

    impl NameSource for Pool {
        async fn candidates(&self) -> HookResult<Vec<String>> {
            Ok(self.0.iter().map(|name| name.to_string()).collect())
        }
    }

    #[derive(Default)]
    struct Down(AtomicUsize);

    impl NameSource for Down {
        async fn candidates(&self) -> HookResult<Vec<String>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(HookError::upstream(Service::Names, UpstreamStatus::Code(503)))
        }
    }

    /// Answers with each scripted result in turn.
    struct Script(Mutex<Vec<HookResult<Vec<String>>>>);

    impl NameSource for Script {
        async fn candidates(&self) -> HookResult<Vec<String>> {
            self.0.lock().unwrap().remove(0)
        }
    }

    fn used(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn normalizes_case_and_spaces() {
        assert_eq!(normalize("Luke Skywalker"), "luke_skywalker");
        assert_eq!(normalize("  Obi-Wan   Kenobi "), "obi-wan_kenobi");
        assert_eq!(normalize("R2-D2"), "r2-d2");
    }

    #[test]
    fn normalize_is_idempotent() {
        for name in ["luke_skywalker", "c-3po", "beru_whitesun_lars", "Darth Vader"] {
            let once = normalize(name);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn used_names_are_normalized() {
        let hooks = [Webhook {
            room_id: "1".into(),
            name: "Han Solo".into(),
            template: 1,
        }];
        assert_eq!(used_names(&hooks), used(&["han_solo"]));
    }

    #[tokio::test]
    async fn returns_the_only_unused_name() {
        let allocator = Allocator::new(Pool(vec!["Luke Skywalker", "Han Solo", "Leia Organa"]), 1);
        let name = allocator
            .allocate(&used(&["luke_skywalker", "leia_organa"]))
            .await
            .unwrap();
        assert_eq!(name, "han_solo");
    }

    #[tokio::test]
    async fn result_is_never_used() {
        let allocator = Allocator::new(Pool(vec!["Yoda", "Chewbacca", "Jabba Desilijic Tiure"]), 1);
        let taken = used(&["yoda"]);
        for _ in 0..20 {
            let name = allocator.allocate(&taken).await.unwrap();
            assert!(!taken.contains(&name));
            assert_eq!(normalize(&name), name);
        }
    }

    #[tokio::test]
    async fn one_free_name_in_a_page_is_always_found() {
        let allocator = Allocator::new(
            Pool(vec![
                "Luke Skywalker", "C-3PO", "R2-D2", "Darth Vader", "Leia Organa",
                "Owen Lars", "Beru Whitesun lars", "R5-D4", "Biggs Darklighter", "Obi-Wan Kenobi",
            ]),
            16,
        );
        let taken = used(&[
            "luke_skywalker", "c-3po", "r2-d2", "darth_vader", "leia_organa",
            "owen_lars", "beru_whitesun_lars", "r5-d4", "biggs_darklighter",
        ]);
        for _ in 0..1000 {
            assert_eq!(allocator.allocate(&taken).await.unwrap(), "obi-wan_kenobi");
        }
    }

    #[tokio::test]
    async fn exhausted_pool_fails_fast() {
        let allocator = Allocator::new(Pool(vec!["Yoda", "Chewbacca"]), 8);
        let err = allocator.allocate(&used(&["yoda", "chewbacca"])).await.unwrap_err();
        assert_eq!(err, HookError::PoolExhausted { attempts: 1 });
    }

    #[tokio::test]
    async fn persistent_failure_is_bounded() {
        let source = Down::default();
        let allocator = Allocator::new(&source, 5);
        let err = allocator.allocate(&HashSet::new()).await.unwrap_err();
        assert_eq!(err, HookError::SourceUnavailable);
        assert_eq!(source.0.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn empty_pools_count_as_unavailable() {
        let allocator = Allocator::new(Pool(vec![]), 3);
        let err = allocator.allocate(&HashSet::new()).await.unwrap_err();
        assert_eq!(err, HookError::SourceUnavailable);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let source = Script(Mutex::new(vec![
            Err(HookError::upstream(Service::Names, UpstreamStatus::Timeout)),
            Ok(vec![]),
            Ok(vec!["Wedge Antilles".to_owned()]),
        ]));
        let allocator = Allocator::new(source, 3);
        assert_eq!(allocator.allocate(&HashSet::new()).await.unwrap(), "wedge_antilles");
    }
}
