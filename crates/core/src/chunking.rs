use crate::error::IngestError;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap_size: usize,
}

impl ChunkingConfig {
    /// Rejects window geometries that cannot advance. Runs before any
    /// file is touched.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap_size >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap_size {} must be smaller than chunk_size {}",
                self.overlap_size, self.chunk_size
            )));
        }
        Ok(())
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// Fixed-size sliding-window split. Consecutive windows share exactly
/// `overlap_size` characters; the final window may be shorter. Empty
/// input yields no windows.
pub fn split_fixed_windows(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let step = config.chunk_size - config.overlap_size;
    let mut windows = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof   spacing";
        let normalized = normalize_whitespace(input);
        assert_eq!(normalized, "A lot of spacing");
    }

    #[test]
    fn window_count_matches_closed_form() {
        // ceil((L - O) / (C - O)) windows for L > O
        let cases = [(10usize, 5usize, 2usize), (8, 5, 2), (100, 12, 3), (12, 12, 4)];
        for (length, chunk_size, overlap_size) in cases {
            let text: String = std::iter::repeat('x').take(length).collect();
            let config = ChunkingConfig {
                chunk_size,
                overlap_size,
            };
            let windows = split_fixed_windows(&text, config).unwrap();
            let expected = (length - overlap_size).div_ceil(chunk_size - overlap_size);
            assert_eq!(windows.len(), expected, "L={length} C={chunk_size} O={overlap_size}");
        }
    }

    #[test]
    fn consecutive_windows_share_exactly_the_overlap() {
        let text: String = ('a'..='z').collect();
        let config = ChunkingConfig {
            chunk_size: 8,
            overlap_size: 3,
        };
        let windows = split_fixed_windows(&text, config).unwrap();
        for pair in windows.windows(2) {
            let tail: String = pair[0].chars().rev().take(3).collect::<Vec<_>>().into_iter().rev().collect();
            assert!(pair[1].starts_with(&tail));
            assert!(!pair[1].starts_with(&pair[0][pair[0].len() - 4..]));
        }
    }

    #[test]
    fn empty_text_yields_no_windows() {
        let config = ChunkingConfig {
            chunk_size: 5,
            overlap_size: 1,
        };
        assert!(split_fixed_windows("", config).unwrap().is_empty());
    }

    #[test]
    fn overlap_not_smaller_than_chunk_size_is_rejected() {
        let config = ChunkingConfig {
            chunk_size: 4,
            overlap_size: 4,
        };
        let result = split_fixed_windows("abcdefgh", config);
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }

    #[test]
    fn short_text_yields_a_single_window() {
        let config = ChunkingConfig {
            chunk_size: 64,
            overlap_size: 8,
        };
        let windows = split_fixed_windows("short text", config).unwrap();
        assert_eq!(windows, vec!["short text".to_string()]);
    }
}
