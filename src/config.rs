use crate::error::{KeyTraceError, KtResult};
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MAX_HISTOGRAM_BINS: usize = 1_000;
pub const MAX_SUGGESTION_COUNT: usize = 10_000;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub patterns: PatternParams,
    #[command(flatten)]
    pub coverage: CoverageParams,
    #[command(flatten)]
    pub deviation: DeviationParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    /// Transitions at or above this many ms are idle time, not typing.
    #[arg(long, default_value_t = 5000.0)]
    pub max_duration_ms: f64,
    #[arg(long, default_value_t = 1)]
    pub min_pattern_samples: usize,
    /// Width of the MAD acceptance band, in MADs either side of the median.
    #[arg(long, default_value_t = 3.0)]
    pub mad_threshold: f64,
    /// Outlier filtering starts at this many samples.
    #[arg(long, default_value_t = 4)]
    pub mad_min_samples: usize,
    #[arg(long, default_value_t = 10)]
    pub histogram_bins: usize,
    #[arg(long, default_value_t = 20)]
    pub summary_limit: usize,
    #[arg(long, default_value_t = 50)]
    pub example_word_limit: usize,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            max_duration_ms: 5000.0,
            min_pattern_samples: 1,
            mad_threshold: 3.0,
            mad_min_samples: 4,
            histogram_bins: 10,
            summary_limit: 20,
            example_word_limit: 50,
        }
    }
}

impl PatternParams {
    /// Accepted durations are strictly inside (0, max).
    #[inline(always)]
    pub fn accepts(&self, duration: f64) -> bool {
        duration > 0.0 && duration < self.max_duration_ms
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageParams {
    #[arg(long, default_value_t = 5)]
    pub min_samples_per_pair: usize,
    #[arg(long, default_value_t = 8)]
    pub target_samples_per_pair: usize,
    #[arg(long, default_value_t = 400)]
    pub min_total_trigraphs: usize,
    #[arg(long, default_value_t = 500)]
    pub target_total_trigraphs: usize,
    #[arg(long, default_value_t = 5)]
    pub suggestion_count: usize,
}

impl Default for CoverageParams {
    fn default() -> Self {
        Self {
            min_samples_per_pair: 5,
            target_samples_per_pair: 8,
            min_total_trigraphs: 400,
            target_total_trigraphs: 500,
            suggestion_count: 5,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviationParams {
    #[arg(long, default_value_t = 100)]
    pub word_limit: usize,
    #[arg(long, default_value_t = 50)]
    pub recent_limit: usize,
    #[arg(long, default_value_t = 50)]
    pub pattern_limit: usize,
}

impl Default for DeviationParams {
    fn default() -> Self {
        Self {
            word_limit: 100,
            recent_limit: 50,
            pattern_limit: 50,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> KtResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KtResult<()> {
        let p = &self.patterns;
        if !(p.max_duration_ms > 0.0) {
            return Err(KeyTraceError::Config(format!(
                "max_duration_ms must be positive (got {})",
                p.max_duration_ms
            )));
        }
        if p.histogram_bins == 0 || p.histogram_bins > MAX_HISTOGRAM_BINS {
            return Err(KeyTraceError::Config(format!(
                "histogram_bins must be between 1 and {} (got {})",
                MAX_HISTOGRAM_BINS, p.histogram_bins
            )));
        }
        if !(p.mad_threshold > 0.0) {
            return Err(KeyTraceError::Config(format!(
                "mad_threshold must be positive (got {})",
                p.mad_threshold
            )));
        }

        let c = &self.coverage;
        if c.target_samples_per_pair < c.min_samples_per_pair {
            return Err(KeyTraceError::Config(format!(
                "target_samples_per_pair ({}) is below min_samples_per_pair ({})",
                c.target_samples_per_pair, c.min_samples_per_pair
            )));
        }
        if c.suggestion_count > MAX_SUGGESTION_COUNT {
            return Err(KeyTraceError::Config(format!(
                "suggestion_count must be at most {} (got {})",
                MAX_SUGGESTION_COUNT, c.suggestion_count
            )));
        }
        if c.target_total_trigraphs == 0 || c.target_total_trigraphs < c.min_total_trigraphs {
            return Err(KeyTraceError::Config(format!(
                "target_total_trigraphs ({}) must be positive and >= min_total_trigraphs ({})",
                c.target_total_trigraphs, c.min_total_trigraphs
            )));
        }
        Ok(())
    }

    /// Overlays only the flags the user typed onto a file-loaded config.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($group:ident . $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$group.$field = cli.$group.$field.clone();
                }
            };
        }

        update_if_present!(patterns.max_duration_ms);
        update_if_present!(patterns.min_pattern_samples);
        update_if_present!(patterns.mad_threshold);
        update_if_present!(patterns.mad_min_samples);
        update_if_present!(patterns.histogram_bins);
        update_if_present!(patterns.summary_limit);
        update_if_present!(patterns.example_word_limit);

        update_if_present!(coverage.min_samples_per_pair);
        update_if_present!(coverage.target_samples_per_pair);
        update_if_present!(coverage.min_total_trigraphs);
        update_if_present!(coverage.target_total_trigraphs);
        update_if_present!(coverage.suggestion_count);

        update_if_present!(deviation.word_limit);
        update_if_present!(deviation.recent_limit);
        update_if_present!(deviation.pattern_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches, Parser};

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_merge_only_takes_explicit_flags() {
        let matches = Harness::command()
            .try_get_matches_from(["kt", "--histogram-bins", "12"])
            .unwrap();
        let cli = Harness::from_arg_matches(&matches).unwrap().config;

        let mut file_config = Config::default();
        file_config.patterns.summary_limit = 7;
        file_config.merge_from_cli(&cli, &matches);

        assert_eq!(file_config.patterns.histogram_bins, 12);
        assert_eq!(file_config.patterns.summary_limit, 7, "default must not clobber file value");
    }

    #[test]
    fn test_rejects_inverted_targets() {
        let mut config = Config::default();
        config.coverage.target_samples_per_pair = 2;
        assert!(matches!(config.validate(), Err(KeyTraceError::Config(_))));
    }
}
