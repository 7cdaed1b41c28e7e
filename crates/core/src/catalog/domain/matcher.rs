use crate::shared::embedding::{cosine_similarity, Embedding};

use super::catalog::Catalog;

/// Best catalog match for a probe embedding.
#[derive(Clone, Debug)]
pub struct Match {
    pub identity_id: String,
    /// Evidence path of the single sample that produced the score.
    pub sample_path: String,
    pub score: f32,
}

/// Linear nearest-neighbor scan over the whole catalog.
///
/// An identity's score is the maximum similarity across its samples, not
/// the average: one good enrolled sample is enough to match despite pose
/// or lighting variance in the others. Ties keep the first-seen record.
/// Returns `None` on an empty catalog (score 0.0 by convention).
///
/// O(identities x samples) per probe, which is fine at the catalog sizes
/// this system targets; no indexing is used.
pub fn find_best_match(probe: &Embedding, catalog: &Catalog) -> Option<Match> {
    let mut best: Option<Match> = None;

    for record in catalog.all() {
        let mut record_best: Option<(&str, f32)> = None;
        for sample in record.samples() {
            match cosine_similarity(probe, sample.embedding()) {
                Ok(score) => {
                    if record_best.map_or(true, |(_, s)| score > s) {
                        record_best = Some((sample.evidence_path(), score));
                    }
                }
                Err(e) => {
                    log::warn!(
                        "skipping sample {} of identity {}: {e}",
                        sample.evidence_path(),
                        record.id()
                    );
                }
            }
        }

        if let Some((path, score)) = record_best {
            // Strict greater-than keeps the first-seen identity on ties.
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Match {
                    identity_id: record.id().to_string(),
                    sample_path: path.to_string(),
                    score,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::identity::Sample;
    use approx::assert_relative_eq;

    fn sample(values: Vec<f32>, path: &str) -> Sample {
        Sample::new(Embedding::new(values), path.to_string())
    }

    #[test]
    fn test_empty_catalog_returns_none() {
        let catalog = Catalog::new(5);
        let probe = Embedding::new(vec![1.0, 0.0]);
        assert!(find_best_match(&probe, &catalog).is_none());
    }

    #[test]
    fn test_identical_embedding_scores_one() {
        let mut catalog = Catalog::new(5);
        catalog.upsert_append("p1", sample(vec![0.6, 0.8], "p1.png"));
        let probe = Embedding::new(vec![0.6, 0.8]);

        let m = find_best_match(&probe, &catalog).unwrap();
        assert_eq!(m.identity_id, "p1");
        assert_eq!(m.sample_path, "p1.png");
        assert_relative_eq!(m.score, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_identity_matches_on_its_best_sample() {
        let mut catalog = Catalog::new(5);
        // One poor sample, one near-perfect sample for the same identity.
        catalog.upsert_append("p1", sample(vec![0.0, 1.0], "bad.png"));
        catalog.upsert_append("p1", sample(vec![1.0, 0.01], "good.png"));
        let probe = Embedding::new(vec![1.0, 0.0]);

        let m = find_best_match(&probe, &catalog).unwrap();
        assert_eq!(m.sample_path, "good.png");
        assert!(m.score > 0.99);
    }

    #[test]
    fn test_global_maximum_wins_across_identities() {
        let mut catalog = Catalog::new(5);
        catalog.upsert_append("far", sample(vec![0.0, 1.0], "far.png"));
        catalog.upsert_append("near", sample(vec![0.9, 0.1], "near.png"));
        let probe = Embedding::new(vec![1.0, 0.0]);

        let m = find_best_match(&probe, &catalog).unwrap();
        assert_eq!(m.identity_id, "near");
    }

    #[test]
    fn test_tie_keeps_first_seen_identity() {
        let mut catalog = Catalog::new(5);
        catalog.upsert_append("first", sample(vec![1.0, 0.0], "a.png"));
        catalog.upsert_append("second", sample(vec![1.0, 0.0], "b.png"));
        let probe = Embedding::new(vec![1.0, 0.0]);

        let m = find_best_match(&probe, &catalog).unwrap();
        assert_eq!(m.identity_id, "first");
    }

    #[test]
    fn test_mismatched_sample_skipped_not_fatal() {
        let mut catalog = Catalog::new(5);
        catalog.upsert_append("p1", sample(vec![1.0, 0.0, 0.0], "wrong-dim.png"));
        catalog.upsert_append("p2", sample(vec![0.8, 0.6], "ok.png"));
        let probe = Embedding::new(vec![0.8, 0.6]);

        let m = find_best_match(&probe, &catalog).unwrap();
        assert_eq!(m.identity_id, "p2");
    }

    #[test]
    fn test_scan_is_read_only() {
        let mut catalog = Catalog::new(5);
        catalog.upsert_append("p1", sample(vec![1.0, 0.0], "a.png"));
        let probe = Embedding::new(vec![0.5, 0.5]);

        let first = find_best_match(&probe, &catalog).unwrap();
        let second = find_best_match(&probe, &catalog).unwrap();
        assert_eq!(first.identity_id, second.identity_id);
        assert_relative_eq!(first.score, second.score);
        assert_eq!(catalog.lookup("p1").unwrap().samples().len(), 1);
    }
}
