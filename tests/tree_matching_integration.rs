use std::sync::Arc;

use errtree::{arc, AnyError, Code, Error};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
#[error("shard {shard} unreachable")]
struct ShardDown {
    shard: u32,
}

#[derive(Debug, thiserror::Error)]
#[error("replication lag {0}ms")]
struct ReplicationLag(u64);

fn io_err(msg: &str) -> errtree::ArcError {
    arc(std::io::Error::new(
        std::io::ErrorKind::Other,
        msg.to_string(),
    ))
}

fn commit_error() -> (Error, errtree::ArcError, errtree::ArcError) {
    let shard = arc(ShardDown { shard: 4 });
    let lag = arc(ReplicationLag(1500));
    let quorum = Error::new("quorum lost")
        .with_errors([shard.clone(), lag.clone()])
        .with_code(Code::UNAVAILABLE);
    let commit = Error::new("commit aborted").with_errors([arc(quorum), io_err("wal fsync")]);
    (commit, shard, lag)
}

// ---------------------------------------------------------------------------
// Matching across the tree
// ---------------------------------------------------------------------------

#[test]
fn matches_deep_causes_and_codes() {
    let (commit, shard, lag) = commit_error();

    // identity of deeply nested causes
    assert!(errtree::is(Some(&commit), Some(shard.as_error())));
    assert!(errtree::is(Some(&commit), Some(lag.as_error())));
    // the nested tree's code is reachable from the root
    assert!(errtree::is(Some(&commit), Some(&Code::UNAVAILABLE)));
    assert!(!errtree::is(Some(&commit), Some(&Code::DATA_LOSS)));

    // extraction pulls the nested values out through the tree
    assert_eq!(errtree::find_code(&commit), Some(Code::UNAVAILABLE));
    assert_eq!(errtree::find_ref::<ShardDown>(&commit).unwrap().shard, 4);
    assert!(errtree::has_type::<ReplicationLag>(&commit));

    // type identity ignores values
    assert!(errtree::type_is(&commit, &ShardDown { shard: 99 }));
}

#[test]
fn direct_causes_are_a_flat_view() {
    let (commit, _, _) = commit_error();
    let causes = errtree::find_causes(&commit).unwrap();
    assert_eq!(causes.len(), 2);
    // one level deep: the nested tree arrives as a tree, not flattened
    assert!(causes[0].as_any().downcast_ref::<Error>().is_some());
    // element probes still delegate to each element's own capability
    assert!(errtree::is_slice(causes, &Code::UNAVAILABLE));
    assert_eq!(errtree::find_in_slice::<ShardDown>(causes).unwrap().shard, 4);
}

#[test]
fn foreign_chains_interoperate() {
    #[derive(Debug, thiserror::Error)]
    #[error("handler failed: {source}")]
    struct Handler {
        #[source]
        source: std::io::Error,
    }

    let foreign = Handler {
        source: std::io::Error::new(std::io::ErrorKind::TimedOut, "slow disk"),
    };
    // a foreign error walks through source() with the same primitives
    assert!(errtree::has_type::<std::io::Error>(&foreign));

    // and can live inside a tree next to native causes
    let tree = Error::new("request").with_errors([arc(foreign)]);
    assert_eq!(
        errtree::find_ref::<std::io::Error>(&tree).unwrap().kind(),
        std::io::ErrorKind::TimedOut
    );
}

#[test]
fn anyhow_sources_participate() {
    fn parse() -> anyhow::Result<()> {
        Err(anyhow::anyhow!("bad header at byte 12"))
    }

    let err = Error::new("import feed").with_source(parse().unwrap_err());
    assert!(!err.is_empty());
    assert_eq!(err.causes().len(), 1);
    assert_eq!(err.to_string(), "import feed [bad header at byte 12]");
}

// ---------------------------------------------------------------------------
// Iteration
// ---------------------------------------------------------------------------

#[test]
fn cause_iteration_steps_then_restarts() {
    let tree = Error::new("sweep")
        .with_errors([io_err("one"), io_err("two")])
        .with_code(Code::ABORTED);

    let mut iter = tree.iterate_causes();
    let mut first_round = Vec::new();
    while let Some(e) = iter.next() {
        first_round.push(e.to_string());
    }
    assert_eq!(first_round, ["one", "two", "ABORTED"]);

    // the while-let above consumed the reset; the same iterator replays
    let second_round: Vec<_> = iter.by_ref().map(|e| e.to_string()).collect();
    assert_eq!(second_round, first_round);
}

#[test]
fn two_iterators_do_not_interfere() {
    let tree = Error::new("w").with_errors([io_err("a"), io_err("b")]);
    let mut x = tree.iterate_causes();
    let mut y = tree.iterate_causes();
    assert_eq!(x.next().unwrap().to_string(), "a");
    assert_eq!(y.next().unwrap().to_string(), "a");
    assert_eq!(x.next().unwrap().to_string(), "b");
}

// ---------------------------------------------------------------------------
// Templates and the registry, end to end
// ---------------------------------------------------------------------------

#[test]
fn registered_code_flows_through_matching() {
    let no_lease = errtree::register_slot(311, "NO_LEASE");
    assert_eq!(no_lease, Code(-1311));

    let template = Error::templated("lease {} not granted").with_code(no_lease);
    let err = template.format_with(["db-main"]);

    assert_eq!(err.to_string(), "lease db-main not granted");
    assert!(template.is_descended(&err));
    assert!(err.is(&no_lease));

    // the text fallback recognizes a plain error carrying the code's name
    let plain = Error::new("no_lease");
    assert!(errtree::is(Some(&err), Some(&plain)));
}

#[test]
fn collector_pattern_round_trip() {
    fn sweep(paths: &[&str]) -> errtree::Result<()> {
        let mut bucket = Error::new("sweep failed").with_code(Code::INTERNAL);
        for p in paths {
            if let Err(e) = std::fs::metadata(p) {
                bucket.attach([Some(arc(e))]);
            }
        }
        bucket.finish()
    }

    let err = sweep(&["/no/such/x", "/no/such/y"]).unwrap_err();
    assert_eq!(err.causes().len(), 2);
    assert!(err.is(&Code::INTERNAL));

    let report = format!("{:?}", err);
    assert!(report.contains("Causes:"));
    assert!(report.contains("Origin: "));
}

#[test]
fn walk_covers_the_whole_tree() {
    let (commit, _, _) = commit_error();
    let mut leaves = 0;
    errtree::walk(&commit, |e| {
        if errtree::unwrap_once(e).is_none() {
            leaves += 1;
        }
        false
    });
    // shard, lag, and the wal io error have no further causes
    assert_eq!(leaves, 3);
}

#[test]
fn shared_handles_alias_across_trees() {
    let shared = io_err("pool exhausted");
    let a = Error::new("query").with_errors([shared.clone()]);
    let b = Error::new("migration").with_errors([shared.clone()]);
    assert_eq!(Arc::strong_count(&shared), 3);
    // both trees match the one underlying error
    assert!(a.is(shared.as_error()));
    assert!(b.is(shared.as_error()));
    // but not each other
    assert!(!a.is(&b));
}
