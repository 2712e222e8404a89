use ::config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Engine-wide tunables: defaults merged with `SQLRA_`-prefixed environment
/// overrides via the `config` crate.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Highest rewrite-rule optimization level the rewriter will apply.
    /// 0 disables rewriting entirely (plan executes as lowered verbatim);
    /// levels above the rule library's maximum saturate at the library max.
    pub optimization_level: u8,
    /// Default Tee buffer capacity in rows before spilling logic would
    /// apply (no spill-to-disk path exists; this just bounds the in-memory
    /// `VecDeque` used to replay already-consumed rows to a lagging tap).
    pub tee_buffer_rows: usize,
    /// Maximum fixpoint iterations the rewriter will run before giving up
    /// and returning the tree as-is, guarding against a non-confluent rule
    /// interaction looping forever.
    pub max_rewrite_iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            optimization_level: 5,
            tee_buffer_rows: 1024,
            max_rewrite_iterations: 64,
        }
    }
}

impl EngineConfig {
    /// Loads defaults overridden by `SQLRA_*` environment variables, e.g.
    /// `SQLRA_OPTIMIZATION_LEVEL=0`.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("optimization_level", 5)?
            .set_default("tee_buffer_rows", 1024)?
            .set_default("max_rewrite_iterations", 64)?
            .add_source(Environment::with_prefix("SQLRA"))
            .build()?;
        config.try_deserialize()
    }
}
