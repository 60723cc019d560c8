use super::parse_env;

/// Limits applied to report intake and enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationConfig {
    pub max_evidence: usize,
    pub description_max: usize,
    pub max_ban_hours: u32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            max_evidence: 10,
            description_max: 2000,
            max_ban_hours: 87_600, // ten years
        }
    }
}

impl ModerationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_evidence: parse_env("REPORT_MAX_EVIDENCE", defaults.max_evidence),
            description_max: parse_env("REPORT_DESCRIPTION_MAX", defaults.description_max),
            max_ban_hours: parse_env("MODERATION_MAX_BAN_HOURS", defaults.max_ban_hours),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_ban_hours == 0 {
            anyhow::bail!("MODERATION_MAX_BAN_HOURS must be > 0");
        }
        if self.description_max == 0 {
            anyhow::bail!("REPORT_DESCRIPTION_MAX must be > 0");
        }
        Ok(())
    }
}
