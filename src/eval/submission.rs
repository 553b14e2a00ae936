//! Submission artifact for the OOD predictions.
//!
//! A delimited text file with the fixed schema `id,label`, one row per
//! sample, rows in the order the predictions were produced.

use std::path::Path;

use anyhow::{Context, Result};

/// Write the submission file from (id, predicted label) pairs
pub fn write_submission(path: &Path, predictions: &[(usize, usize)]) -> Result<()> {
    let mut content = String::with_capacity(16 + predictions.len() * 8);
    content.push_str("id,label\n");

    for (id, label) in predictions {
        content.push_str(&format!("{},{}\n", id, label));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {:?}", parent))?;
        }
    }

    std::fs::write(path, content).with_context(|| format!("failed to write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submission_ood.csv");

        write_submission(&path, &[(0, 42), (1, 7), (2, 99)]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "id,label");
        assert_eq!(lines[1], "0,42");
        assert_eq!(lines[3], "2,99");
    }

    #[test]
    fn test_order_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submission_ood.csv");

        // Ids intentionally out of numeric order; the writer must not sort.
        write_submission(&path, &[(5, 1), (2, 2), (9, 3)]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let ids: Vec<&str> = content
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["5", "2", "9"]);
    }

    #[test]
    fn test_empty_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submission_ood.csv");

        write_submission(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id,label\n");
    }
}
