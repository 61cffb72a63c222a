use alloy_primitives::{keccak256, Address, Bytes, PrimitiveSignature, B256, U256};
use alloy_sol_types::SolInterface;

use crate::{
    interfaces::IAccount, AccountError, AccountExecutor, CallContext, CallError, UserOperation,
    ValidationData,
};

/// Length of a plain signature.
const SIGNATURE_LENGTH: usize = 65;
/// Length of a signature followed by `validUntil` and `validAfter` (six bytes each).
const WINDOWED_SIGNATURE_LENGTH: usize = SIGNATURE_LENGTH + 12;

/// An account owned by a single ECDSA key.
///
/// The owner signs the EIP-191 message of the operation hash. A signature may carry a validity
/// window: `signature(65) | validUntil(6) | validAfter(6)`, in which case the signed message is
/// `keccak256(opHash | validUntil | validAfter)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleAccount {
    address: Address,
    owner: Address,
    entry_point: Address,
}

impl SimpleAccount {
    /// Creates an account at `address`.
    pub const fn new(address: Address, owner: Address, entry_point: Address) -> Self {
        Self { address, owner, entry_point }
    }

    /// The message the owner signs for `user_op_hash` within an optional window.
    pub fn signing_message(user_op_hash: B256, window: Option<(u64, u64)>) -> B256 {
        match window {
            None => user_op_hash,
            Some((valid_until, valid_after)) => {
                let mut buf = [0u8; 44];
                buf[..32].copy_from_slice(user_op_hash.as_slice());
                buf[32..38].copy_from_slice(&valid_until.to_be_bytes()[2..]);
                buf[38..].copy_from_slice(&valid_after.to_be_bytes()[2..]);
                keccak256(buf)
            }
        }
    }

    /// Signs `op` as the owner for the given entry point and chain, appending the window to the
    /// signature when one is given.
    #[cfg(feature = "signer")]
    pub fn sign_user_op<S: alloy_signer::SignerSync>(
        mut op: UserOperation,
        signer: &S,
        entry_point: Address,
        chain_id: u64,
        window: Option<(u64, u64)>,
    ) -> alloy_signer::Result<UserOperation> {
        let message = Self::signing_message(op.hash(entry_point, chain_id), window);
        let signature = signer.sign_message_sync(message.as_slice())?;
        let mut bytes = signature.as_bytes().to_vec();
        if let Some((valid_until, valid_after)) = window {
            bytes.extend_from_slice(&valid_until.to_be_bytes()[2..]);
            bytes.extend_from_slice(&valid_after.to_be_bytes()[2..]);
        }
        op.signature = bytes.into();
        Ok(op)
    }

    fn check_signature(
        &self,
        signature: &[u8],
        user_op_hash: B256,
    ) -> Result<ValidationData, AccountError> {
        let window = match signature.len() {
            SIGNATURE_LENGTH => None,
            WINDOWED_SIGNATURE_LENGTH => {
                let mut until = [0u8; 8];
                let mut after = [0u8; 8];
                until[2..].copy_from_slice(&signature[65..71]);
                after[2..].copy_from_slice(&signature[71..77]);
                Some((u64::from_be_bytes(until), u64::from_be_bytes(after)))
            }
            len => return Err(AccountError::InvalidSignatureLength(len)),
        };
        let parsed = PrimitiveSignature::try_from(&signature[..SIGNATURE_LENGTH])
            .map_err(|_| AccountError::InvalidSignature)?;
        let signer = parsed
            .recover_address_from_msg(Self::signing_message(user_op_hash, window))
            .map_err(|_| AccountError::InvalidSignature)?;

        let sig_failed = signer != self.owner;
        Ok(match window {
            None if sig_failed => ValidationData::sig_failed(),
            None => ValidationData::valid(),
            Some((valid_until, valid_after)) => {
                ValidationData::with_window(sig_failed, valid_after, valid_until)
            }
        })
    }

    fn ensure_owner_or_entry_point(&self, caller: Address) -> Result<(), CallError> {
        if caller == self.owner || caller == self.entry_point {
            Ok(())
        } else {
            Err(CallError::NotOwnerOrEntryPoint)
        }
    }
}

impl AccountExecutor for SimpleAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn validate_user_op(
        &self,
        ctx: &mut CallContext<'_>,
        op: &UserOperation,
        user_op_hash: B256,
        missing_account_funds: U256,
    ) -> Result<ValidationData, AccountError> {
        ctx.charge(ctx.config.gas.validate_user_op).map_err(|_| AccountError::OutOfGas)?;
        let validation = self.check_signature(&op.signature, user_op_hash)?;

        if !missing_account_funds.is_zero() {
            // The entry point verifies the deposit afterwards.
            let _ = ctx.call(self.address, ctx.entry_point(), missing_account_funds, &Bytes::new());
        }
        Ok(validation)
    }

    fn execute(
        &self,
        ctx: &mut CallContext<'_>,
        caller: Address,
        data: &Bytes,
    ) -> Result<Bytes, CallError> {
        if data.is_empty() {
            return Ok(Bytes::new());
        }
        let call = IAccount::IAccountCalls::abi_decode(data, true).map_err(|_| {
            CallError::UnknownSelector(data.slice(..data.len().min(4)))
        })?;
        self.ensure_owner_or_entry_point(caller)?;
        match call {
            IAccount::IAccountCalls::execute(call) => {
                ctx.call(self.address, call.dest, call.value, &call.func)?;
            }
            IAccount::IAccountCalls::executeBatch(call) => {
                if call.dest.len() != call.func.len() {
                    return Err(CallError::WrongArrayLengths);
                }
                for (dest, func) in call.dest.iter().zip(&call.func) {
                    ctx.call(self.address, *dest, U256::ZERO, func)?;
                }
            }
        }
        Ok(Bytes::new())
    }
}
