//! Reduction of per-peer errors to a single cluster-wide outcome

use crate::common::{Error, Result};

/// Strict majority of `n` peers.
pub fn read_quorum(n: usize) -> usize {
    n / 2 + 1
}

/// Most frequent error among `errs`, skipping `None` and anything in
/// `ignored`, with its count. Ties go to the error seen first.
///
/// Returns `(0, None)` when no error remains.
pub fn reduce_errs(errs: &[Option<Error>], ignored: &[Error]) -> (usize, Option<Error>) {
    let mut counts: Vec<(&Error, usize)> = Vec::new();
    for err in errs.iter().flatten() {
        if ignored.contains(err) {
            continue;
        }
        match counts.iter_mut().find(|(seen, _)| *seen == err) {
            Some((_, count)) => *count += 1,
            None => counts.push((err, 1)),
        }
    }

    let mut best: Option<(&Error, usize)> = None;
    for (err, count) in counts {
        if best.map_or(true, |(_, max)| count > max) {
            best = Some((err, count));
        }
    }
    match best {
        Some((err, count)) => (count, Some(err.clone())),
        None => (0, None),
    }
}

/// Decide a read round: `Ok` if no peer failed, the shared error if at
/// least `quorum` peers agree on it, `InsufficientReadQuorum` otherwise.
pub fn reduce_read_quorum_errs(
    errs: &[Option<Error>],
    ignored: &[Error],
    quorum: usize,
) -> Result<()> {
    match reduce_errs(errs, ignored) {
        (_, None) => Ok(()),
        (count, Some(err)) if count >= quorum => Err(err),
        _ => Err(Error::InsufficientReadQuorum),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable() -> Option<Error> {
        Some(Error::PeerUnreachable("connection refused".into()))
    }

    #[test]
    fn test_read_quorum() {
        assert_eq!(read_quorum(1), 1);
        assert_eq!(read_quorum(2), 2);
        assert_eq!(read_quorum(3), 2);
        assert_eq!(read_quorum(4), 3);
        assert_eq!(read_quorum(5), 3);
    }

    #[test]
    fn test_reduce_no_errors() {
        assert_eq!(reduce_errs(&[None, None, None], &[]), (0, None));
        assert_eq!(reduce_errs(&[], &[]), (0, None));
    }

    #[test]
    fn test_reduce_picks_most_frequent() {
        let errs = vec![
            Some(Error::Remote("disk full".into())),
            unreachable(),
            None,
            unreachable(),
        ];
        assert_eq!(reduce_errs(&errs, &[]), (2, unreachable()));
    }

    #[test]
    fn test_reduce_tie_prefers_first_seen() {
        let errs = vec![None, Some(Error::Remote("a".into())), Some(Error::Remote("b".into()))];
        assert_eq!(reduce_errs(&errs, &[]), (1, Some(Error::Remote("a".into()))));
    }

    #[test]
    fn test_reduce_skips_ignored() {
        let errs = vec![unreachable(), unreachable(), Some(Error::Remote("x".into()))];
        let ignored = [Error::PeerUnreachable("connection refused".into())];
        assert_eq!(
            reduce_errs(&errs, &ignored),
            (1, Some(Error::Remote("x".into())))
        );
    }

    #[test]
    fn test_read_quorum_outcomes() {
        let q = read_quorum(3);
        assert_eq!(reduce_read_quorum_errs(&[None, None, None], &[], q), Ok(()));
        assert_eq!(
            reduce_read_quorum_errs(&[None, unreachable(), None], &[], q),
            Err(Error::InsufficientReadQuorum)
        );
        assert_eq!(
            reduce_read_quorum_errs(&[None, unreachable(), unreachable()], &[], q),
            Err(Error::PeerUnreachable("connection refused".into()))
        );
        assert_eq!(
            reduce_read_quorum_errs(
                &[None, unreachable(), Some(Error::Remote("x".into()))],
                &[],
                q
            ),
            Err(Error::InsufficientReadQuorum)
        );
    }
}
