// wallet-core/src/chains/solana/transaction.rs
//
// Legacy (non-versioned) Solana transactions: instruction builders, message
// compilation and wire serialization.
//
// Wire layout:
//   tx      = compact(n_sigs) sig[64]* message
//   message = header[3] compact(n_keys) key[32]* blockhash[32]
//             compact(n_ix) (program_idx compact(n) idx* compact(len) data)*

use crate::chains::solana::address::{programs, Pubkey};
use crate::chains::solana::signer::SolanaSigner;
use crate::error::{CryptoError, WalletError, WalletResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

// =============================================================================
// INSTRUCTION BUILDERS
// =============================================================================

/// System program `Transfer { lamports }`.
pub fn system_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Instruction {
        program_id: programs::system(),
        accounts: vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*to, false),
        ],
        data,
    }
}

/// SPL token `TransferChecked { amount, decimals }`. Works for both the
/// token and token-2022 programs.
pub fn spl_transfer_checked(
    token_program: &Pubkey,
    source: &Pubkey,
    mint: &Pubkey,
    destination: &Pubkey,
    owner: &Pubkey,
    amount: u64,
    decimals: u8,
) -> Instruction {
    let mut data = Vec::with_capacity(10);
    data.push(12);
    data.extend_from_slice(&amount.to_le_bytes());
    data.push(decimals);

    Instruction {
        program_id: *token_program,
        accounts: vec![
            AccountMeta::writable(*source, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*owner, true),
        ],
        data,
    }
}

/// Associated token account `CreateIdempotent`: a no-op when the account
/// already exists.
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    associated_account: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> WalletResult<Instruction> {
    Ok(Instruction {
        program_id: programs::id(programs::ASSOCIATED_TOKEN)?,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(*associated_account, false),
            AccountMeta::readonly(*owner, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(programs::system(), false),
            AccountMeta::readonly(*token_program, false),
        ],
        data: vec![1],
    })
}

// =============================================================================
// MESSAGE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Orders accounts as writable signers, readonly signers, writable
    /// non-signers, readonly non-signers, with `payer` first. Flags of an
    /// account used by several instructions are merged.
    pub fn compile(
        instructions: &[Instruction],
        payer: &Pubkey,
        recent_blockhash: [u8; 32],
    ) -> WalletResult<Self> {
        let mut metas: Vec<AccountMeta> = vec![AccountMeta::writable(*payer, true)];
        let mut upsert = |meta: AccountMeta| match metas.iter_mut().find(|m| m.pubkey == meta.pubkey) {
            Some(existing) => {
                existing.is_signer |= meta.is_signer;
                existing.is_writable |= meta.is_writable;
            }
            None => metas.push(meta),
        };

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.clone());
            }
            upsert(AccountMeta::readonly(ix.program_id, false));
        }

        // stable sort keeps the payer ahead of other writable signers
        metas.sort_by_key(|m| match (m.is_signer, m.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        if metas.len() > u8::MAX as usize {
            return Err(WalletError::SubmissionFailed(format!(
                "Too many accounts for one transaction: {}",
                metas.len()
            )));
        }

        let count = |signer: bool, writable: bool| {
            metas
                .iter()
                .filter(|m| m.is_signer == signer && m.is_writable == writable)
                .count() as u8
        };
        let header = MessageHeader {
            num_required_signatures: metas.iter().filter(|m| m.is_signer).count() as u8,
            num_readonly_signed_accounts: count(true, false),
            num_readonly_unsigned_accounts: count(false, false),
        };

        let account_keys: Vec<Pubkey> = metas.iter().map(|m| m.pubkey).collect();
        let index_of = |key: &Pubkey| -> u8 {
            // every key was inserted above, and there are at most 255
            account_keys.iter().position(|k| k == key).unwrap_or(0) as u8
        };

        let compiled = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: index_of(&ix.program_id),
                accounts: ix.accounts.iter().map(|m| index_of(&m.pubkey)).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.account_keys.len() * 32);
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);

        encode_compact_u16(self.account_keys.len(), &mut out);
        for key in &self.account_keys {
            out.extend_from_slice(&key.0);
        }
        out.extend_from_slice(&self.recent_blockhash);

        encode_compact_u16(self.instructions.len(), &mut out);
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_compact_u16(ix.accounts.len(), &mut out);
            out.extend_from_slice(&ix.accounts);
            encode_compact_u16(ix.data.len(), &mut out);
            out.extend_from_slice(&ix.data);
        }
        out
    }

    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..self.header.num_required_signatures as usize]
    }
}

// =============================================================================
// TRANSACTION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSolanaTransaction {
    pub signatures: Vec<[u8; 64]>,
    pub message: Vec<u8>,
}

impl SignedSolanaTransaction {
    /// Signs `message` with each signer in the order the message lists them.
    pub fn sign(message: &Message, signers: &[&SolanaSigner]) -> WalletResult<Self> {
        let bytes = message.serialize();
        let signatures = message
            .signer_keys()
            .iter()
            .map(|key| {
                signers
                    .iter()
                    .find(|s| s.pubkey() == *key)
                    .map(|s| s.sign(&bytes))
                    .ok_or_else(|| {
                        WalletError::Crypto(CryptoError::SigningFailed(format!(
                            "Missing signer for {}",
                            key
                        )))
                    })
            })
            .collect::<WalletResult<Vec<_>>>()?;

        Ok(Self {
            signatures,
            message: bytes,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.signatures.len() * 64 + self.message.len());
        encode_compact_u16(self.signatures.len(), &mut out);
        for sig in &self.signatures {
            out.extend_from_slice(sig);
        }
        out.extend_from_slice(&self.message);
        out
    }

    /// The transaction id: base58 of the fee payer's signature.
    pub fn signature(&self) -> String {
        self.signatures
            .first()
            .map(|s| bs58::encode(s).into_string())
            .unwrap_or_default()
    }
}

/// Solana "shortvec": 7 bits per byte, little-endian, high bit = continue.
pub fn encode_compact_u16(value: usize, out: &mut Vec<u8>) {
    let mut rem = value as u16;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(seed: u8) -> SolanaSigner {
        SolanaSigner::from_secret(&[seed; 32])
    }

    fn compact(n: usize) -> Vec<u8> {
        let mut v = Vec::new();
        encode_compact_u16(n, &mut v);
        v
    }

    #[test]
    fn test_compact_u16() {
        assert_eq!(compact(0), [0x00]);
        assert_eq!(compact(0x7f), [0x7f]);
        assert_eq!(compact(0x80), [0x80, 0x01]);
        assert_eq!(compact(0x3fff), [0xff, 0x7f]);
        assert_eq!(compact(0x4000), [0x80, 0x80, 0x01]);
        assert_eq!(compact(0xffff), [0xff, 0xff, 0x03]);
    }

    #[test]
    fn test_system_transfer_message_bytes() {
        let from = signer(1).pubkey();
        let to = signer(2).pubkey();
        let blockhash = [9u8; 32];

        let message = Message::compile(&[system_transfer(&from, &to, 1)], &from, blockhash).unwrap();
        assert_eq!(message.account_keys, vec![from, to, programs::system()]);

        let mut expected = vec![1, 0, 1, 3];
        expected.extend_from_slice(&from.0);
        expected.extend_from_slice(&to.0);
        expected.extend_from_slice(&[0u8; 32]);
        expected.extend_from_slice(&blockhash);
        expected.extend_from_slice(&[1, 2, 2, 0, 1, 12]);
        expected.extend_from_slice(&[2, 0, 0, 0]);
        expected.extend_from_slice(&1u64.to_le_bytes());

        assert_eq!(message.serialize(), expected);
    }

    #[test]
    fn test_token_transfer_account_ordering() {
        let owner = signer(1).pubkey();
        let recipient = signer(2).pubkey();
        let mint = signer(3).pubkey();
        let source = signer(4).pubkey();
        let dest = signer(5).pubkey();
        let token = programs::id(programs::TOKEN).unwrap();

        let ixs = vec![
            create_associated_token_account_idempotent(&owner, &dest, &recipient, &mint, &token).unwrap(),
            spl_transfer_checked(&token, &source, &mint, &dest, &owner, 1_500_000, 6),
        ];
        let message = Message::compile(&ixs, &owner, [0u8; 32]).unwrap();

        // owner signs once even though two instructions reference it
        assert_eq!(message.header.num_required_signatures, 1);
        assert_eq!(message.header.num_readonly_signed_accounts, 0);
        assert_eq!(message.account_keys[0], owner);

        // dest and source writable; recipient, mint, system, token, ATA program readonly
        assert_eq!(message.header.num_readonly_unsigned_accounts, 5);
        assert_eq!(&message.account_keys[1..3], &[dest, source]);

        let transfer = &message.instructions[1];
        assert_eq!(transfer.data[0], 12);
        assert_eq!(&transfer.data[1..9], &1_500_000u64.to_le_bytes());
        assert_eq!(transfer.data[9], 6);
        let keys: Vec<Pubkey> = transfer.accounts.iter().map(|i| message.account_keys[*i as usize]).collect();
        assert_eq!(keys, vec![source, mint, dest, owner]);
    }

    #[test]
    fn test_sign_and_serialize() {
        let payer = signer(1);
        let to = signer(2).pubkey();
        let message = Message::compile(&[system_transfer(&payer.pubkey(), &to, 42)], &payer.pubkey(), [3u8; 32]).unwrap();

        let tx = SignedSolanaTransaction::sign(&message, &[&payer]).unwrap();
        let wire = tx.serialize();
        assert_eq!(wire[0], 1);
        assert_eq!(&wire[1..65], &tx.signatures[0]);
        assert_eq!(&wire[65..], message.serialize().as_slice());

        let verifying = ed25519_dalek::VerifyingKey::from_bytes(&payer.pubkey().0).unwrap();
        let sig = ed25519_dalek::Signature::from_bytes(&tx.signatures[0]);
        assert!(verifying.verify_strict(&tx.message, &sig).is_ok());
        assert_eq!(bs58::decode(tx.signature()).into_vec().unwrap(), tx.signatures[0].to_vec());
    }

    #[test]
    fn test_missing_signer_rejected() {
        let payer = signer(1);
        let message = Message::compile(&[system_transfer(&payer.pubkey(), &signer(2).pubkey(), 1)], &payer.pubkey(), [0u8; 32]).unwrap();
        assert!(SignedSolanaTransaction::sign(&message, &[&signer(7)]).is_err());
    }
}
