use anyhow::Context;

/// The default maximum number of candidates the expansion engine may examine
/// for a single rule in a single query.
const DEFAULT_MAX_CANDIDATES: usize = 100_000;

/// Tunables for occurrence generation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    max_candidates: usize,
}

impl Config {
    /// Returns a configuration with defaults, overridden by any environment
    /// variables that are set.
    ///
    /// Currently this only reads `OCCUR_MAX_CANDIDATES`. Invalid values are
    /// logged and ignored.
    pub fn from_env() -> Config {
        let mut config = Config::default();
        match read_env_occur_max_candidates() {
            Ok(Some(max)) => {
                log::trace!(
                    "setting candidate limit to `{max}` from \
                     `OCCUR_MAX_CANDIDATES` environment variable",
                );
                config.max_candidates = max;
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!(
                    "reading `OCCUR_MAX_CANDIDATES` failed, using default \
                     limit of `{DEFAULT_MAX_CANDIDATES}`: {err:#}",
                );
            }
        }
        config
    }

    /// Sets the maximum number of candidates examined per rule per query.
    ///
    /// When a query exceeds this, it fails with
    /// [`Error::ExpansionLimitExceeded`](crate::Error::ExpansionLimitExceeded).
    /// A limit of `0` is treated as `1`.
    pub fn max_candidates(self, max: usize) -> Config {
        Config { max_candidates: max.max(1) }
    }

    /// Returns the maximum number of candidates examined per rule per query.
    pub fn get_max_candidates(&self) -> usize {
        self.max_candidates
    }
}

impl Default for Config {
    fn default() -> Config {
        Config { max_candidates: DEFAULT_MAX_CANDIDATES }
    }
}

fn read_env_occur_max_candidates() -> anyhow::Result<Option<usize>> {
    let Some(val) = std::env::var_os("OCCUR_MAX_CANDIDATES") else {
        return Ok(None);
    };
    let Some(val) = val.to_str() else {
        anyhow::bail!(
            "`OCCUR_MAX_CANDIDATES` environment variable is not valid \
             UTF-8: {val:?}"
        )
    };
    parse_max_candidates(val).map(Some)
}

fn parse_max_candidates(val: &str) -> anyhow::Result<usize> {
    let max = val.parse::<usize>().with_context(|| {
        format!(
            "`OCCUR_MAX_CANDIDATES` environment variable `{val}` is not \
             a valid non-negative integer"
        )
    })?;
    anyhow::ensure!(
        max >= 1,
        "`OCCUR_MAX_CANDIDATES` environment variable must be at least 1",
    );
    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_default() {
        assert_eq!(Config::default().get_max_candidates(), 100_000);
        assert_eq!(Config::default().max_candidates(50).get_max_candidates(), 50);
        assert_eq!(Config::default().max_candidates(0).get_max_candidates(), 1);
    }

    #[test]
    fn max_candidates_from_env_value() {
        assert_eq!(parse_max_candidates("500").unwrap(), 500);
        insta::assert_snapshot!(
            parse_max_candidates("0").unwrap_err(),
            @"`OCCUR_MAX_CANDIDATES` environment variable must be at least 1",
        );
        insta::assert_snapshot!(
            parse_max_candidates("lots").unwrap_err(),
            @"`OCCUR_MAX_CANDIDATES` environment variable `lots` is not a valid non-negative integer",
        );
        assert!(parse_max_candidates("-5").is_err());
    }
}
