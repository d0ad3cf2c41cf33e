use crate::signal::TimeSeries;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a plain-text series. Values may be split across lines, commas or
/// whitespace; blank lines and `#` comments are skipped.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or("").trim();
        for token in content
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let val: f64 = token
                .parse()
                .with_context(|| format!("line {} is not f64: {}", idx + 1, token))?;
            out.push(val);
        }
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text).with_context(|| format!("in {}", path.display()))
}

/// Read a uniformly sampled series recorded at `fs`.
pub fn read_time_series(path: &Path, fs: f64) -> Result<TimeSeries> {
    if !fs.is_finite() || fs <= 0.0 {
        anyhow::bail!("sampling frequency must be positive, got {}", fs);
    }
    Ok(TimeSeries {
        fs,
        data: read_f64_series(path)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mixed_separators_and_comments() {
        let text = "# filtered IR\n1.5\n2, 3.25\n\n-4 5e1 # trailing note\n";
        assert_eq!(
            parse_f64_series(text).unwrap(),
            vec![1.5, 2.0, 3.25, -4.0, 50.0]
        );
    }

    #[test]
    fn bad_token_names_the_line() {
        let err = parse_f64_series("1\n2\nthree\n").unwrap_err();
        assert!(err.to_string().contains("line 3"));
        assert!(parse_f64_series("# only comments\n\n").is_err());
    }

    #[test]
    fn time_series_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1\n2\n3\n4").unwrap();
        let ts = read_time_series(file.path(), 2.0).unwrap();
        assert_eq!(ts.len(), 4);
        assert_eq!(ts.duration(), 2.0);
        assert!(read_time_series(file.path(), 0.0).is_err());
    }
}
