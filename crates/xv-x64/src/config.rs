//! Decoder configuration.

/// Architectural upper bound on the length of one instruction.
pub const MAX_INSTRUCTION_LENGTH: usize = 15;

/// How the prefix scanner treats a legacy prefix that follows a REX byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RexPolicy {
    /// REX must immediately precede the opcode. A legacy prefix after it is
    /// read as the opcode and reported as a prefix conflict.
    #[default]
    Strict,
    /// Hardware behavior: the REX byte is dropped and scanning continues.
    Lenient,
}

/// Options for [`Decoder`](crate::Decoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecoderConfig {
    /// Longest instruction accepted, in bytes (1..=15).
    pub max_length: usize,
    /// REX placement policy.
    pub rex_policy: RexPolicy,
    /// Report `Truncated` instead of `EndOfInput` when an instruction starts
    /// but its remaining bytes are missing.
    pub report_truncation: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_length: MAX_INSTRUCTION_LENGTH,
            rex_policy: RexPolicy::Strict,
            report_truncation: false,
        }
    }
}

impl DecoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the length limit, clamped to `1..=15`.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.clamp(1, MAX_INSTRUCTION_LENGTH);
        self
    }

    pub fn with_rex_policy(mut self, rex_policy: RexPolicy) -> Self {
        self.rex_policy = rex_policy;
        self
    }

    pub fn with_report_truncation(mut self, report_truncation: bool) -> Self {
        self.report_truncation = report_truncation;
        self
    }

    /// The length limit actually enforced.
    pub(crate) fn length_limit(&self) -> usize {
        self.max_length.clamp(1, MAX_INSTRUCTION_LENGTH)
    }
}
