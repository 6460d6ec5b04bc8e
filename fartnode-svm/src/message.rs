//! Message building, lookup-table-aware instruction splicing and wire encoding.
//!
//! Built transactions are unsigned: every required signer gets a zero-filled
//! placeholder signature so the wire format stays valid while the transaction
//! is handed to a wallet or simulated without signature verification.
//!
//! Instruction order is always caller-determined. The convention followed by
//! every call site in this workspace is compute-unit limit, compute-unit
//! price, domain instructions, identity memo, user memo.

use fartnode::encoding::Base64Bytes;
use solana_address_lookup_table_interface::state::AddressLookupTable;
use solana_instruction::{AccountMeta, Instruction};
use solana_message::compiled_instruction::CompiledInstruction;
use solana_message::{AddressLookupTableAccount, CompileError, Hash, VersionedMessage, legacy, v0};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;

use crate::chain::RpcClientLike;
use crate::compute::is_compute_budget_instruction;

/// Errors raised while building, editing or encoding transactions.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The instructions could not be compiled into a message.
    #[error("failed to compile message: {0}")]
    Compile(#[from] CompileError),
    /// A lookup table referenced by the message could not be fetched.
    #[error("Failed to load address lookup table {address}: {message}")]
    MissingLookupTable {
        /// The lookup table address.
        address: Pubkey,
        /// Why it could not be loaded.
        message: String,
    },
    /// A lookup table account did not hold a valid table.
    #[error("invalid address lookup table {address}: {message}")]
    InvalidLookupTable {
        /// The lookup table address.
        address: Pubkey,
        /// The decode error.
        message: String,
    },
    /// A compiled instruction referenced an account the message does not carry.
    #[error("account index {index} out of range")]
    AccountIndexOutOfRange {
        /// The offending index.
        index: usize,
    },
    /// The message has no fee payer.
    #[error("message has no fee payer")]
    MissingPayer,
    /// Bincode serialization failed.
    #[error("failed to serialize transaction: {0}")]
    Serialize(#[source] bincode::Error),
    /// Bincode deserialization failed.
    #[error("failed to deserialize transaction: {0}")]
    Deserialize(#[source] bincode::Error),
    /// The base64 text was malformed.
    #[error("invalid base64 transaction: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Where spliced instructions go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SplicePosition {
    /// After the existing instructions.
    #[default]
    Append,
    /// Before the existing instructions.
    Prepend,
}

/// Zero-filled signature slots for `message`, at least one.
fn placeholder_signatures(message: &VersionedMessage) -> Vec<Signature> {
    let required = usize::from(message.header().num_required_signatures).max(1);
    vec![Signature::default(); required]
}

/// Compiles `instructions` into an unsigned v0 transaction.
///
/// # Errors
///
/// Returns [`MessageError::Compile`] if the instructions cannot be compiled
/// against `lookup_tables`.
pub fn build_versioned_transaction(
    payer: &Pubkey,
    instructions: &[Instruction],
    blockhash: Hash,
    lookup_tables: &[AddressLookupTableAccount],
) -> Result<VersionedTransaction, MessageError> {
    let message = VersionedMessage::V0(v0::Message::try_compile(
        payer,
        instructions,
        lookup_tables,
        blockhash,
    )?);
    Ok(VersionedTransaction {
        signatures: placeholder_signatures(&message),
        message,
    })
}

/// Fetches every lookup table referenced by `message`.
///
/// Legacy messages and v0 messages without lookups resolve to an empty list.
///
/// # Errors
///
/// Returns [`MessageError::MissingLookupTable`] if any table cannot be
/// fetched and [`MessageError::InvalidLookupTable`] if one cannot be decoded.
pub async fn resolve_lookup_tables<C: RpcClientLike>(
    client: &C,
    message: &VersionedMessage,
) -> Result<Vec<AddressLookupTableAccount>, MessageError> {
    let Some(lookups) = message.address_table_lookups() else {
        return Ok(Vec::new());
    };
    let mut tables = Vec::with_capacity(lookups.len());
    for lookup in lookups {
        let address = lookup.account_key;
        let account = client.get_account(&address).await.map_err(|e| {
            MessageError::MissingLookupTable {
                address,
                message: e.to_string(),
            }
        })?;
        let table = AddressLookupTable::deserialize(&account.data).map_err(|e| {
            MessageError::InvalidLookupTable {
                address,
                message: e.to_string(),
            }
        })?;
        tables.push(AddressLookupTableAccount {
            key: address,
            addresses: table.addresses.to_vec(),
        });
    }
    Ok(tables)
}

/// All account keys of `message` in index order: static keys, then writable
/// and readonly lookup-loaded keys.
fn loaded_account_keys(
    message: &VersionedMessage,
    lookup_tables: &[AddressLookupTableAccount],
) -> Result<(Vec<Pubkey>, usize), MessageError> {
    let mut keys = message.static_account_keys().to_vec();
    let Some(lookups) = message.address_table_lookups() else {
        return Ok((keys, 0));
    };

    let mut writable = Vec::new();
    let mut readonly = Vec::new();
    for lookup in lookups {
        let table = lookup_tables
            .iter()
            .find(|table| table.key == lookup.account_key)
            .ok_or_else(|| MessageError::MissingLookupTable {
                address: lookup.account_key,
                message: "not supplied".to_owned(),
            })?;
        let select = |indexes: &[u8], into: &mut Vec<Pubkey>| -> Result<(), MessageError> {
            for index in indexes {
                let index = usize::from(*index);
                let address = table
                    .addresses
                    .get(index)
                    .ok_or(MessageError::AccountIndexOutOfRange { index })?;
                into.push(*address);
            }
            Ok(())
        };
        select(&lookup.writable_indexes, &mut writable)?;
        select(&lookup.readonly_indexes, &mut readonly)?;
    }
    let writable_loaded = writable.len();
    keys.extend(writable);
    keys.extend(readonly);
    Ok((keys, writable_loaded))
}

/// Decompiles `message` back into editable instructions.
///
/// Signer and writable flags are recovered from the message header for
/// static keys; lookup-loaded keys are never signers.
///
/// # Errors
///
/// Returns [`MessageError`] if a referenced lookup table is not supplied or an
/// account index is out of range.
pub fn decompile_instructions(
    message: &VersionedMessage,
    lookup_tables: &[AddressLookupTableAccount],
) -> Result<Vec<Instruction>, MessageError> {
    let header = message.header();
    let num_static = message.static_account_keys().len();
    let num_signed = usize::from(header.num_required_signatures);
    let num_writable_signed = num_signed.saturating_sub(usize::from(header.num_readonly_signed_accounts));
    let num_writable_unsigned =
        num_static.saturating_sub(usize::from(header.num_readonly_unsigned_accounts));
    let (keys, writable_loaded) = loaded_account_keys(message, lookup_tables)?;

    let meta = |index: usize| -> Result<AccountMeta, MessageError> {
        let pubkey = *keys
            .get(index)
            .ok_or(MessageError::AccountIndexOutOfRange { index })?;
        let (is_signer, is_writable) = if index < num_signed {
            (true, index < num_writable_signed)
        } else if index < num_static {
            (false, index < num_writable_unsigned)
        } else {
            (false, index < num_static + writable_loaded)
        };
        Ok(AccountMeta {
            pubkey,
            is_signer,
            is_writable,
        })
    };

    message
        .instructions()
        .iter()
        .map(|ix: &CompiledInstruction| {
            let program_index = usize::from(ix.program_id_index);
            let program_id = *keys
                .get(program_index)
                .ok_or(MessageError::AccountIndexOutOfRange {
                    index: program_index,
                })?;
            let accounts = ix
                .accounts
                .iter()
                .map(|index| meta(usize::from(*index)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Instruction {
                program_id,
                accounts,
                data: ix.data.clone(),
            })
        })
        .collect()
}

/// Compiles `instructions` in the same format as `original`: legacy stays
/// legacy, v0 is recompiled against `lookup_tables`.
///
/// # Errors
///
/// Returns [`MessageError::Compile`] if v0 compilation fails.
pub fn recompile(
    original: &VersionedMessage,
    payer: &Pubkey,
    instructions: &[Instruction],
    lookup_tables: &[AddressLookupTableAccount],
) -> Result<VersionedMessage, MessageError> {
    let blockhash = *original.recent_blockhash();
    if let VersionedMessage::Legacy(_) = original {
        return Ok(VersionedMessage::Legacy(legacy::Message::new_with_blockhash(
            instructions,
            Some(payer),
            &blockhash,
        )));
    }
    Ok(VersionedMessage::V0(v0::Message::try_compile(
        payer,
        instructions,
        lookup_tables,
        blockhash,
    )?))
}

async fn rebuild<C, F>(
    client: &C,
    transaction: VersionedTransaction,
    edit: F,
) -> Result<VersionedTransaction, MessageError>
where
    C: RpcClientLike,
    F: FnOnce(&mut Vec<Instruction>),
{
    let lookup_tables = resolve_lookup_tables(client, &transaction.message).await?;
    let payer = *transaction
        .message
        .static_account_keys()
        .first()
        .ok_or(MessageError::MissingPayer)?;
    let mut instructions = decompile_instructions(&transaction.message, &lookup_tables)?;
    edit(&mut instructions);
    let message = recompile(&transaction.message, &payer, &instructions, &lookup_tables)?;
    Ok(VersionedTransaction {
        signatures: placeholder_signatures(&message),
        message,
    })
}

/// Splices `instructions` into an already compiled transaction.
///
/// Lookup tables referenced by the message are fetched through `client`; a
/// missing table fails the whole operation. Existing instructions keep their
/// order. The result is unsigned.
///
/// # Errors
///
/// Returns [`MessageError`] if a lookup table cannot be resolved or the edited
/// message cannot be compiled.
pub async fn splice_instructions<C: RpcClientLike>(
    client: &C,
    transaction: VersionedTransaction,
    instructions: Vec<Instruction>,
    position: SplicePosition,
) -> Result<VersionedTransaction, MessageError> {
    if instructions.is_empty() {
        return Ok(transaction);
    }
    rebuild(client, transaction, |existing| match position {
        SplicePosition::Append => existing.extend(instructions),
        SplicePosition::Prepend => {
            existing.splice(0..0, instructions);
        }
    })
    .await
}

/// Replaces any compute-budget instructions with `budget`, placed first.
///
/// # Errors
///
/// Same as [`splice_instructions`].
pub async fn prepend_compute_budget<C: RpcClientLike>(
    client: &C,
    transaction: VersionedTransaction,
    budget: [Instruction; 2],
) -> Result<VersionedTransaction, MessageError> {
    append_with_compute_budget(client, transaction, Vec::new(), budget).await
}

/// Appends `instructions` and replaces any compute-budget instructions with
/// `budget`, placed first, in a single decompile/recompile pass.
///
/// # Errors
///
/// Same as [`splice_instructions`].
pub async fn append_with_compute_budget<C: RpcClientLike>(
    client: &C,
    transaction: VersionedTransaction,
    instructions: Vec<Instruction>,
    budget: [Instruction; 2],
) -> Result<VersionedTransaction, MessageError> {
    rebuild(client, transaction, |existing| {
        existing.extend(instructions);
        existing.retain(|ix| !is_compute_budget_instruction(ix));
        existing.splice(0..0, budget);
    })
    .await
}

/// Points `transaction` at `blockhash`, discarding any signatures.
pub fn replace_blockhash(transaction: &mut VersionedTransaction, blockhash: Hash) {
    transaction.message.set_recent_blockhash(blockhash);
    transaction.signatures = placeholder_signatures(&transaction.message);
}

/// Pads the signature list with zero-filled placeholders up to the required
/// signer count, at least one.
pub fn ensure_signature_slots(transaction: &mut VersionedTransaction) {
    let required = usize::from(transaction.message.header().num_required_signatures).max(1);
    if transaction.signatures.len() < required {
        transaction.signatures.resize(required, Signature::default());
    }
}

/// Serializes `transaction` to its wire bytes after [`ensure_signature_slots`].
///
/// # Errors
///
/// Returns [`MessageError::Serialize`] if bincode fails.
pub fn serialize_transaction(transaction: &mut VersionedTransaction) -> Result<Vec<u8>, MessageError> {
    ensure_signature_slots(transaction);
    bincode::serialize(transaction).map_err(MessageError::Serialize)
}

/// Base64 of [`serialize_transaction`].
///
/// # Errors
///
/// Returns [`MessageError::Serialize`] if bincode fails.
pub fn serialize_transaction_base64(
    transaction: &mut VersionedTransaction,
) -> Result<String, MessageError> {
    Ok(Base64Bytes::encode(serialize_transaction(transaction)?).into_string())
}

/// Base64 of the wire bytes, leaving signatures untouched.
///
/// # Errors
///
/// Returns [`MessageError::Serialize`] if bincode fails.
pub fn encode_transaction_base64(transaction: &VersionedTransaction) -> Result<String, MessageError> {
    let bytes = bincode::serialize(transaction).map_err(MessageError::Serialize)?;
    Ok(Base64Bytes::encode(bytes).into_string())
}

/// Decodes a base64 wire transaction.
///
/// # Errors
///
/// Returns [`MessageError`] if the text is not base64 or not a transaction.
pub fn deserialize_transaction_base64(encoded: &str) -> Result<VersionedTransaction, MessageError> {
    let bytes = Base64Bytes::from(encoded.trim()).decode()?;
    bincode::deserialize(&bytes).map_err(MessageError::Deserialize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::compute_budget_instructions;
    use crate::memo::memo_instruction;
    use crate::testing::{MockRpc, lookup_table_account};
    use solana_compute_budget_interface::ComputeBudgetInstruction;

    fn transfer(from: &Pubkey, to: &Pubkey) -> Instruction {
        solana_system_interface::instruction::transfer(from, to, 42)
    }

    fn budgeted(payer: &Pubkey, to: &Pubkey) -> Vec<Instruction> {
        let [limit, price] = compute_budget_instructions(200_000, 5_000).unwrap();
        vec![limit, price, transfer(payer, to)]
    }

    #[test]
    fn builds_unsigned_v0_with_placeholders() {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let hash = Hash::new_from_array([5; 32]);

        let tx = build_versioned_transaction(&payer, &budgeted(&payer, &to), hash, &[]).unwrap();

        assert!(matches!(tx.message, VersionedMessage::V0(_)));
        assert_eq!(tx.signatures, vec![Signature::default()]);
        assert_eq!(tx.message.static_account_keys()[0], payer);
        assert_eq!(*tx.message.recent_blockhash(), hash);
    }

    #[test]
    fn base64_round_trip_preserves_structure() {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let hash = Hash::new_from_array([5; 32]);
        let mut tx = build_versioned_transaction(&payer, &budgeted(&payer, &to), hash, &[]).unwrap();

        let encoded = serialize_transaction_base64(&mut tx).unwrap();
        let decoded = deserialize_transaction_base64(&encoded).unwrap();

        assert_eq!(decoded.message.static_account_keys()[0], payer);
        assert_eq!(decoded.message.instructions().len(), 3);
        assert_eq!(*decoded.message.recent_blockhash(), hash);
        assert!(!decoded.signatures.is_empty());
        assert_eq!(decoded, tx);
    }

    #[test]
    fn missing_slots_are_padded() {
        let payer = Pubkey::new_unique();
        let mut tx = build_versioned_transaction(
            &payer,
            &[memo_instruction("x")],
            Hash::new_from_array([1; 32]),
            &[],
        )
        .unwrap();
        tx.signatures.clear();

        let bytes = serialize_transaction(&mut tx).unwrap();

        assert_eq!(tx.signatures, vec![Signature::default()]);
        let decoded: VersionedTransaction = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.signatures.len(), 1);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            deserialize_transaction_base64("%%%"),
            Err(MessageError::Base64(_))
        ));
        assert!(matches!(
            deserialize_transaction_base64("AAAA"),
            Err(MessageError::Deserialize(_))
        ));
    }

    #[tokio::test]
    async fn append_keeps_existing_order() {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let original = budgeted(&payer, &to);
        let tx = build_versioned_transaction(&payer, &original, Hash::new_from_array([2; 32]), &[])
            .unwrap();
        let rpc = MockRpc::new("m");

        let memo = memo_instruction("note");
        let spliced = splice_instructions(&rpc, tx, vec![memo.clone()], SplicePosition::Append)
            .await
            .unwrap();

        let ixs = decompile_instructions(&spliced.message, &[]).unwrap();
        let mut expected = original;
        expected.push(memo);
        assert_eq!(ixs, expected);
        assert_eq!(*spliced.message.recent_blockhash(), Hash::new_from_array([2; 32]));
    }

    #[tokio::test]
    async fn legacy_stays_legacy() {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let message = legacy::Message::new_with_blockhash(
            &[transfer(&payer, &to)],
            Some(&payer),
            &Hash::new_from_array([4; 32]),
        );
        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::Legacy(message),
        };

        let spliced = splice_instructions(
            &MockRpc::new("m"),
            tx,
            vec![ComputeBudgetInstruction::set_compute_unit_price(1)],
            SplicePosition::Prepend,
        )
        .await
        .unwrap();

        assert!(matches!(spliced.message, VersionedMessage::Legacy(_)));
        let ixs = decompile_instructions(&spliced.message, &[]).unwrap();
        assert_eq!(ixs[0], ComputeBudgetInstruction::set_compute_unit_price(1));
        assert_eq!(ixs[1], transfer(&payer, &to));
    }

    #[tokio::test]
    async fn lookup_tables_are_resolved_and_kept() {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let oracle = Pubkey::new_unique();
        let table_key = Pubkey::new_unique();
        let table = AddressLookupTableAccount {
            key: table_key,
            addresses: vec![to, oracle],
        };
        let program = Pubkey::new_unique();
        let read_oracle = Instruction {
            program_id: program,
            accounts: vec![
                AccountMeta::new(to, false),
                AccountMeta::new_readonly(oracle, false),
            ],
            data: vec![1, 2, 3],
        };
        let original = vec![transfer(&payer, &to), read_oracle];
        let tx = build_versioned_transaction(
            &payer,
            &original,
            Hash::new_from_array([8; 32]),
            std::slice::from_ref(&table),
        )
        .unwrap();
        assert_eq!(tx.message.address_table_lookups().unwrap().len(), 1);

        let rpc = MockRpc::new("m").with(|s| {
            s.accounts.insert(table_key, lookup_table_account(&[to, oracle]));
        });
        let memo = memo_instruction("tagged");
        let spliced = splice_instructions(&rpc, tx, vec![memo.clone()], SplicePosition::Append)
            .await
            .unwrap();

        assert_eq!(spliced.message.address_table_lookups().unwrap().len(), 1);
        let ixs = decompile_instructions(&spliced.message, std::slice::from_ref(&table)).unwrap();
        let mut expected = original;
        expected.push(memo);
        assert_eq!(ixs, expected);
    }

    #[tokio::test]
    async fn missing_lookup_table_fails_loudly() {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let table = AddressLookupTableAccount {
            key: Pubkey::new_unique(),
            addresses: vec![to],
        };
        let tx = build_versioned_transaction(
            &payer,
            &[transfer(&payer, &to)],
            Hash::new_from_array([8; 32]),
            std::slice::from_ref(&table),
        )
        .unwrap();

        let err = splice_instructions(
            &MockRpc::new("m"),
            tx,
            vec![memo_instruction("x")],
            SplicePosition::Append,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MessageError::MissingLookupTable { address, .. } if address == table.key));
    }

    #[tokio::test]
    async fn compute_budget_is_replaced_not_duplicated() {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let tx = build_versioned_transaction(
            &payer,
            &budgeted(&payer, &to),
            Hash::new_from_array([2; 32]),
            &[],
        )
        .unwrap();

        let budget = compute_budget_instructions(1_000_000, 9_999).unwrap();
        let rebuilt = prepend_compute_budget(&MockRpc::new("m"), tx, budget.clone())
            .await
            .unwrap();

        let ixs = decompile_instructions(&rebuilt.message, &[]).unwrap();
        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[..2], budget);
        assert_eq!(ixs[2], transfer(&payer, &to));
    }

    #[tokio::test]
    async fn memos_and_budget_share_one_lookup_table_fetch() {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let table_key = Pubkey::new_unique();
        let table = AddressLookupTableAccount {
            key: table_key,
            addresses: vec![to],
        };
        let tx = build_versioned_transaction(
            &payer,
            &budgeted(&payer, &to),
            Hash::new_from_array([4; 32]),
            std::slice::from_ref(&table),
        )
        .unwrap();
        let rpc = MockRpc::new("m").with(|s| {
            s.accounts.insert(table_key, lookup_table_account(&[to]));
        });

        let memo = memo_instruction("desk");
        let budget = compute_budget_instructions(400_000, 12).unwrap();
        let rebuilt = append_with_compute_budget(&rpc, tx, vec![memo.clone()], budget.clone())
            .await
            .unwrap();

        assert_eq!(rpc.state().account_requests, vec![table_key]);
        let ixs = decompile_instructions(&rebuilt.message, std::slice::from_ref(&table)).unwrap();
        assert_eq!(ixs.len(), 4);
        assert_eq!(ixs[..2], budget);
        assert_eq!(ixs[2], transfer(&payer, &to));
        assert_eq!(ixs[3], memo);
    }

    #[test]
    fn replacing_the_blockhash_resets_signatures() {
        let payer = Pubkey::new_unique();
        let mut tx = build_versioned_transaction(
            &payer,
            &[memo_instruction("x")],
            Hash::new_from_array([1; 32]),
            &[],
        )
        .unwrap();
        tx.signatures[0] = Signature::from([3; 64]);

        replace_blockhash(&mut tx, Hash::new_from_array([6; 32]));

        assert_eq!(*tx.message.recent_blockhash(), Hash::new_from_array([6; 32]));
        assert_eq!(tx.signatures, vec![Signature::default()]);
    }
}
