//! Ranked results and their on-disk layout.

use crate::error::{DoraError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

pub const SELECTIONS_FILE: &str = "selections.csv";
pub const SCORES_FILE: &str = "scores.csv";
pub const METADATA_FILE: &str = "metadata.json";

/// Result-reporting options from the `results` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultsConfig {
    /// Also write the score of every score-set sample.
    #[serde(default)]
    pub save_scores: bool,
    #[serde(default = "default_save_metadata")]
    pub save_metadata: bool,
}

fn default_save_metadata() -> bool {
    true
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            save_scores: false,
            save_metadata: default_save_metadata(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSample {
    /// 1-based position in the ranking.
    pub rank: usize,
    /// Row of the sample in the score matrix.
    pub index: usize,
    pub id: String,
    pub score: f64,
}

/// Tie-break key for sample ids: integer ids compare numerically and sort
/// before every other id, which compare as text.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum IdKey<'a> {
    Integer(i64),
    Text(&'a str),
}

impl<'a> IdKey<'a> {
    fn of(id: &'a str) -> Self {
        match id.parse::<i64>() {
            Ok(value) => IdKey::Integer(value),
            Err(_) => IdKey::Text(id),
        }
    }
}

/// Rank score-set samples by descending score and keep the first `top_n`.
///
/// Equal scores are ordered by ascending id (see [`IdKey`]), then ascending
/// row index.
/// Fails with `DoraError::Algorithm` attributed to `algorithm` when the
/// scores do not line up with the ids or are not finite.
pub fn rank_top_n(
    algorithm: &str,
    ids: &[String],
    scores: &[f64],
    top_n: usize,
) -> Result<Vec<RankedSample>> {
    if ids.len() != scores.len() {
        return Err(DoraError::algorithm(
            algorithm,
            format!("{} scores for {} score-set ids", scores.len(), ids.len()),
        ));
    }
    if let Some(index) = scores.iter().position(|s| !s.is_finite()) {
        return Err(DoraError::algorithm(
            algorithm,
            format!("score of sample {index} ({}) is not finite", ids[index]),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| match scores[b].total_cmp(&scores[a]) {
        Ordering::Equal => IdKey::of(&ids[a])
            .cmp(&IdKey::of(&ids[b]))
            .then_with(|| ids[a].cmp(&ids[b]))
            .then(a.cmp(&b)),
        other => other,
    });

    Ok(order
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(position, index)| RankedSample {
            rank: position + 1,
            index,
            id: ids[index].clone(),
            score: scores[index],
        })
        .collect())
}

/// Describes one algorithm run in `metadata.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata<'a> {
    pub algorithm: &'a str,
    pub params: &'a serde_yaml::Value,
    pub seed: u64,
    pub top_n: usize,
    pub n_fit: usize,
    pub n_score: usize,
    pub n_features: usize,
}

/// Writes one algorithm's results under `<out_dir>/<algorithm>/`.
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    pub fn new(out_dir: &Path, algorithm: &str) -> Self {
        Self {
            dir: out_dir.join(algorithm),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(
        &self,
        ranking: &[RankedSample],
        ids: &[String],
        scores: &[f64],
        metadata: &RunMetadata<'_>,
        config: &ResultsConfig,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let mut selections = String::from("rank,index,id,score\n");
        for sample in ranking {
            selections.push_str(&format!(
                "{},{},{},{}\n",
                sample.rank, sample.index, sample.id, sample.score
            ));
        }
        self.save(SELECTIONS_FILE, &selections)?;

        if config.save_scores {
            let mut all = String::from("index,id,score\n");
            for (index, (id, score)) in ids.iter().zip(scores).enumerate() {
                all.push_str(&format!("{index},{id},{score}\n"));
            }
            self.save(SCORES_FILE, &all)?;
        }

        if config.save_metadata {
            let content = serde_json::to_string_pretty(metadata)?;
            self.save(METADATA_FILE, &content)?;
        }
        Ok(())
    }

    /// Atomic write: temp file, then rename.
    fn save(&self, file_name: &str, content: &str) -> Result<()> {
        let path = self.dir.join(file_name);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
