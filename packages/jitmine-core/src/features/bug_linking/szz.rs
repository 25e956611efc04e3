//! SZZ-style labelling of bug-inducing commits

use super::linker::BugLinkage;
use crate::features::guru_metrics::CommitGuruMetrics;
use crate::features::vcs::{Result, VersionControl};
use std::collections::HashMap;
use tracing::{debug, info};

/// Blames the lines each fix removed and labels the blamed commits
pub struct SzzLabeler;

impl SzzLabeler {
    /// Returns the number of commits newly labelled `contains_bug`
    ///
    /// A blamed commit is only labelled when it is part of `rows` and older
    /// than the fix; blame results outside the mined history are ignored.
    pub async fn label(
        vcs: &dyn VersionControl,
        rows: &mut [CommitGuruMetrics],
        linkages: &[BugLinkage],
    ) -> Result<usize> {
        let index: HashMap<String, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.commit_hash.as_str().to_string(), i))
            .collect();
        let mut labelled = 0;

        for linkage in linkages {
            let Some(&fix_idx) = index.get(linkage.fix_hash.as_str()) else {
                continue;
            };
            let fix_ts = rows[fix_idx].author_timestamp;
            let parent = match rows[fix_idx].parent_hashes.first() {
                Some(p) => p.clone(),
                None => continue,
            };

            let deleted = vcs.deleted_line_ranges(&parent, &linkage.fix_hash).await?;
            for (path, ranges) in &deleted {
                let culprits = vcs.blame_lines(&parent, path, ranges).await?;
                debug!(
                    "SZZ: fix {} {} -> {} candidate(s)",
                    linkage.fix_hash.short(),
                    path,
                    culprits.len()
                );

                for culprit in culprits {
                    let Some(&idx) = index.get(culprit.as_str()) else {
                        continue;
                    };
                    let row = &mut rows[idx];
                    if idx == fix_idx || row.author_timestamp > fix_ts {
                        continue;
                    }
                    if !row.contains_bug {
                        row.contains_bug = true;
                        labelled += 1;
                    }
                    if !row.fixing_commits.contains(&linkage.fix_hash) {
                        row.fixing_commits.push(linkage.fix_hash.clone());
                    }
                }
            }
        }

        info!(
            "SZZ: {} fix commit(s) labelled {} bug-inducing commit(s)",
            linkages.len(),
            labelled
        );
        Ok(labelled)
    }
}
