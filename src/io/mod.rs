use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::Path;

/// Memory-mapped text file of whitespace-separated integers
pub struct NumberReader {
    mmap: Option<Mmap>,
}

impl NumberReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open input file: {}", path.as_ref().display()))?;

        let file_size = file.metadata()?.len();

        // Zero-length files cannot be mapped
        if file_size == 0 {
            return Ok(Self { mmap: None });
        }

        let mmap = unsafe {
            MmapOptions::new()
                .map(&file)
                .with_context(|| "Failed to memory-map input file")?
        };

        Ok(Self { mmap: Some(mmap) })
    }

    pub fn byte_len(&self) -> usize {
        self.mmap.as_ref().map_or(0, |m| m.len())
    }

    pub fn read_values(&self) -> Result<Vec<i64>> {
        let Some(mmap) = &self.mmap else {
            return Ok(Vec::new());
        };

        let text = std::str::from_utf8(mmap).context("Input file is not valid UTF-8")?;
        text.split_whitespace()
            .enumerate()
            .map(|(i, token)| {
                token
                    .parse::<i64>()
                    .with_context(|| format!("Value #{} is not an integer: {:?}", i + 1, token))
            })
            .collect()
    }
}

/// Progress bar counting `total` steps, each shown as one `unit`
pub fn create_progress_bar(total: u64, unit: &str) -> Result<ProgressBar> {
    let template = format!(
        "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{eta}}) {{msg}}",
        unit
    );
    let style = ProgressStyle::default_bar()
        .template(&template)
        .context("Invalid progress bar template")?
        .progress_chars("#>-");

    let pb = ProgressBar::new(total);
    pb.set_style(style);
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_whitespace_separated_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "3 1\n4\t-1\n\n5 ").unwrap();

        let reader = NumberReader::new(file.path()).unwrap();
        assert_eq!(reader.read_values().unwrap(), vec![3, 1, 4, -1, 5]);
    }

    #[test]
    fn test_empty_file_has_no_values() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let reader = NumberReader::new(file.path()).unwrap();
        assert_eq!(reader.byte_len(), 0);
        assert!(reader.read_values().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_integer_token() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1 two 3").unwrap();

        let err = NumberReader::new(file.path()).unwrap().read_values().unwrap_err();
        assert!(err.to_string().contains("Value #2"));
    }

    #[test]
    fn test_progress_bar_counts_steps() {
        let pb = create_progress_bar(4, "max rounds").unwrap();
        assert_eq!(pb.length(), Some(4));
        pb.inc(3);
        assert_eq!(pb.position(), 3);
    }
}
