//! Memo instructions for identity tagging and user notes.

use fartnode::SolanaCoreConfig;
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;
use std::sync::LazyLock;

/// SPL Memo program (v2).
pub static MEMO_PROGRAM_ID: LazyLock<Pubkey> = LazyLock::new(|| {
    "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr"
        .parse()
        .expect("Invalid memo program ID")
});

/// Prefix of identity memos.
pub const IDENTITY_MEMO_PREFIX: &str = "fartnode.identity";

/// A memo instruction with no accounts carrying `text` as UTF-8.
#[must_use]
pub fn memo_instruction(text: &str) -> Instruction {
    Instruction {
        program_id: *MEMO_PROGRAM_ID,
        accounts: Vec::new(),
        data: text.as_bytes().to_vec(),
    }
}

/// Identity memo text from `override_` or the configured identity.
#[must_use]
pub fn identity_memo_text(override_: Option<&str>, config: &SolanaCoreConfig) -> Option<String> {
    override_
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or(config.identity_memo.as_deref())
        .map(|value| format!("{IDENTITY_MEMO_PREFIX}:{value}"))
}

/// Identity memo instruction, or `None` when no identity is set.
#[must_use]
pub fn identity_memo_instruction(
    override_: Option<&str>,
    config: &SolanaCoreConfig,
) -> Option<Instruction> {
    identity_memo_text(override_, config).map(|text| memo_instruction(&text))
}

/// A user memo, trimmed; blank input yields `None`.
#[must_use]
pub fn user_memo_instruction(memo: Option<&str>) -> Option<Instruction> {
    memo.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(memo_instruction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memo_has_no_accounts() {
        let ix = memo_instruction("gm");
        assert_eq!(ix.program_id, *MEMO_PROGRAM_ID);
        assert!(ix.accounts.is_empty());
        assert_eq!(ix.data, b"gm");
    }

    #[test]
    fn identity_prefers_override() {
        let config = SolanaCoreConfig {
            identity_memo: Some("configured".to_owned()),
            ..SolanaCoreConfig::default()
        };
        assert_eq!(
            identity_memo_text(Some("desk-7"), &config).as_deref(),
            Some("fartnode.identity:desk-7")
        );
        assert_eq!(
            identity_memo_text(None, &config).as_deref(),
            Some("fartnode.identity:configured")
        );
        assert!(identity_memo_instruction(None, &SolanaCoreConfig::default()).is_none());
    }

    #[test]
    fn blank_user_memo_is_skipped() {
        assert!(user_memo_instruction(Some("   ")).is_none());
        assert!(user_memo_instruction(None).is_none());
        assert_eq!(user_memo_instruction(Some(" hi ")).unwrap().data, b"hi");
    }
}
