use std::path::Path;

use nalgebra::DMatrix;

use crate::error::{PortfolioError, Result};
use crate::model::dataset::Dataset;

/// Read a delimited numeric text file into an N×C matrix.
///
/// Blank lines and lines starting with `#` are skipped. Fields are trimmed;
/// a whitespace delimiter splits on any run of whitespace.
pub fn load_matrix(path: &Path, delimiter: char) -> Result<DMatrix<f64>> {
    let text = std::fs::read_to_string(path)?;
    parse_matrix(&text, delimiter, &path.display().to_string())
}

pub fn parse_matrix(text: &str, delimiter: char, source_name: &str) -> Result<DMatrix<f64>> {
    let parse_err = |line: usize, msg: String| PortfolioError::Parse {
        source_name: source_name.to_string(),
        line,
        msg,
    };

    let mut values = Vec::new();
    let mut ncols: Option<usize> = None;
    let mut nrows = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = if delimiter.is_whitespace() {
            line.split_whitespace().collect()
        } else {
            line.split(delimiter).map(str::trim).collect()
        };

        let before = values.len();
        for (col, field) in fields.iter().enumerate() {
            let v: f64 = field.parse().map_err(|_| {
                parse_err(line_no, format!("column {}: '{}' is not a number", col + 1, field))
            })?;
            values.push(v);
        }
        let width = values.len() - before;

        match ncols {
            None => ncols = Some(width),
            Some(expected) if expected != width => {
                return Err(parse_err(
                    line_no,
                    format!("expected {} columns, found {}", expected, width),
                ));
            }
            Some(_) => {}
        }
        nrows += 1;
    }

    let ncols = ncols.ok_or_else(|| parse_err(0, "no data rows".to_string()))?;
    Ok(DMatrix::from_row_slice(nrows, ncols, &values))
}

/// Load paired covariate and response files.
pub fn load_dataset(x_path: &Path, y_path: &Path, delimiter: char) -> Result<Dataset> {
    let covariates = load_matrix(x_path, delimiter)?;
    let responses = load_matrix(y_path, delimiter)?;
    if covariates.nrows() != responses.nrows() {
        return Err(PortfolioError::Parse {
            source_name: y_path.display().to_string(),
            line: 0,
            msg: format!(
                "{} rows but {} has {}",
                responses.nrows(),
                x_path.display(),
                covariates.nrows()
            ),
        });
    }
    tracing::info!(
        x = %x_path.display(),
        y = %y_path.display(),
        samples = covariates.nrows(),
        covariate_dim = covariates.ncols(),
        label_dim = responses.ncols(),
        "loaded dataset"
    );
    Dataset::new(covariates, responses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_column_becomes_n_by_one() {
        let m = parse_matrix("1\n2\n\n3\n", ',', "mem").unwrap();
        assert_eq!(m.shape(), (3, 1));
        assert_eq!(m[(2, 0)], 3.0);
    }

    #[test]
    fn whitespace_delimiter_tolerates_runs() {
        let m = parse_matrix("1   2\n\t3 4\n", ' ', "mem").unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m[(1, 0)], 3.0);
    }
}
