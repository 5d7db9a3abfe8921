//! Payload cipher boundary
//!
//! The engine treats the cipher as an opaque in-place block transform. It pads
//! outbound payloads to [`BlockCipher::BLOCK_SIZE`], calls `encrypt` or
//! `decrypt` according to [`CipherConfig`](crate::driver::config::CipherConfig),
//! and for [`ChainMode::CbcMac`] transmits only the tag the cipher leaves in
//! the first [`CBC_MAC_TAG_LEN`] bytes.
//!
//! Two implementations ship with the crate:
//!
//! - [`NullCipher`]: identity, for builds without payload protection
//! - [`SoftAes`] (feature `soft-aes`): AES-128 in software on the `aes` crate

use crate::driver::config::ChainMode;
pub use crate::internal::constants::CBC_MAC_TAG_LEN;
use crate::internal::constants::CIPHER_BLOCK_SIZE;

/// In-place block transform under a chaining mode
pub trait BlockCipher {
    /// Padding granularity in bytes
    const BLOCK_SIZE: usize = CIPHER_BLOCK_SIZE;

    /// Encrypt `buf` in place. For `CbcMac` the tag replaces the first bytes.
    fn encrypt(&mut self, buf: &mut [u8], mode: ChainMode);

    /// Decrypt `buf` in place
    fn decrypt(&mut self, buf: &mut [u8], mode: ChainMode);

    /// Zero-pad `buf[..len]` up to a multiple of [`Self::BLOCK_SIZE`].
    ///
    /// Returns the padded length, or `None` if `buf` is too short to hold it.
    fn pad(&self, buf: &mut [u8], len: usize) -> Option<usize> {
        let padded = len.div_ceil(Self::BLOCK_SIZE) * Self::BLOCK_SIZE;
        let tail = buf.get_mut(len..padded)?;
        tail.fill(0);
        Some(padded)
    }
}

/// Identity transform
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCipher;

impl BlockCipher for NullCipher {
    fn encrypt(&mut self, _buf: &mut [u8], _mode: ChainMode) {}

    fn decrypt(&mut self, _buf: &mut [u8], _mode: ChainMode) {}
}

#[inline]
fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= *s;
    }
}

#[cfg(feature = "soft-aes")]
pub use soft::SoftAes;

#[cfg(feature = "soft-aes")]
mod soft {
    use aes::Aes128;
    use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray};

    use super::{BlockCipher, CIPHER_BLOCK_SIZE, xor_into};
    use crate::driver::config::ChainMode;

    type BlockBytes = [u8; CIPHER_BLOCK_SIZE];

    /// Software AES-128 with a fixed IV reloaded for every call
    ///
    /// Each `encrypt`/`decrypt` call is one independent message, the way the
    /// radio's crypto coprocessor is driven per packet.
    pub struct SoftAes {
        cipher: Aes128,
        iv: BlockBytes,
    }

    impl SoftAes {
        /// Create from a 128-bit key and IV
        pub fn new(key: &[u8; 16], iv: [u8; 16]) -> Self {
            Self {
                cipher: Aes128::new(GenericArray::from_slice(key)),
                iv,
            }
        }

        /// Replace the key
        pub fn set_key(&mut self, key: &[u8; 16]) {
            self.cipher = Aes128::new(GenericArray::from_slice(key));
        }

        /// Replace the IV (initial counter block in CTR mode)
        pub fn set_iv(&mut self, iv: [u8; 16]) {
            self.iv = iv;
        }

        fn encrypt_bytes(&self, input: &BlockBytes) -> BlockBytes {
            let mut block = GenericArray::clone_from_slice(input);
            self.cipher.encrypt_block(&mut block);
            let mut out = [0u8; CIPHER_BLOCK_SIZE];
            out.copy_from_slice(&block);
            out
        }

        fn ecb(&self, buf: &mut [u8], encrypt: bool) {
            for chunk in buf.chunks_exact_mut(CIPHER_BLOCK_SIZE) {
                let block = GenericArray::from_mut_slice(chunk);
                if encrypt {
                    self.cipher.encrypt_block(block);
                } else {
                    self.cipher.decrypt_block(block);
                }
            }
        }

        fn cbc_encrypt(&self, buf: &mut [u8]) {
            let mut prev = self.iv;
            for chunk in buf.chunks_exact_mut(CIPHER_BLOCK_SIZE) {
                xor_into(chunk, &prev);
                self.cipher
                    .encrypt_block(GenericArray::from_mut_slice(chunk));
                prev.copy_from_slice(chunk);
            }
        }

        fn cbc_decrypt(&self, buf: &mut [u8]) {
            let mut prev = self.iv;
            for chunk in buf.chunks_exact_mut(CIPHER_BLOCK_SIZE) {
                let mut saved = [0u8; CIPHER_BLOCK_SIZE];
                saved.copy_from_slice(chunk);
                self.cipher
                    .decrypt_block(GenericArray::from_mut_slice(chunk));
                xor_into(chunk, &prev);
                prev = saved;
            }
        }

        fn cfb(&self, buf: &mut [u8], encrypt: bool) {
            let mut prev = self.iv;
            for chunk in buf.chunks_mut(CIPHER_BLOCK_SIZE) {
                let keystream = self.encrypt_bytes(&prev);
                let full = chunk.len() == CIPHER_BLOCK_SIZE;
                if !encrypt && full {
                    prev.copy_from_slice(chunk);
                }
                xor_into(chunk, &keystream);
                if encrypt && full {
                    prev.copy_from_slice(chunk);
                }
            }
        }

        fn ofb(&self, buf: &mut [u8]) {
            let mut state = self.iv;
            for chunk in buf.chunks_mut(CIPHER_BLOCK_SIZE) {
                state = self.encrypt_bytes(&state);
                xor_into(chunk, &state);
            }
        }

        fn ctr(&self, buf: &mut [u8]) {
            let mut counter = u128::from_be_bytes(self.iv);
            for chunk in buf.chunks_mut(CIPHER_BLOCK_SIZE) {
                let keystream = self.encrypt_bytes(&counter.to_be_bytes());
                xor_into(chunk, &keystream);
                counter = counter.wrapping_add(1);
            }
        }

        fn cbc_mac(&self, buf: &mut [u8]) {
            if buf.is_empty() {
                return;
            }
            let mut state = self.iv;
            for chunk in buf.chunks(CIPHER_BLOCK_SIZE) {
                xor_into(&mut state, chunk);
                state = self.encrypt_bytes(&state);
            }
            let n = buf.len().min(CIPHER_BLOCK_SIZE);
            buf[..n].copy_from_slice(&state[..n]);
        }
    }

    impl BlockCipher for SoftAes {
        fn encrypt(&mut self, buf: &mut [u8], mode: ChainMode) {
            match mode {
                ChainMode::Ecb => self.ecb(buf, true),
                ChainMode::Cbc => self.cbc_encrypt(buf),
                ChainMode::Cfb => self.cfb(buf, true),
                ChainMode::Ofb => self.ofb(buf),
                ChainMode::Ctr => self.ctr(buf),
                ChainMode::CbcMac => self.cbc_mac(buf),
            }
        }

        fn decrypt(&mut self, buf: &mut [u8], mode: ChainMode) {
            match mode {
                ChainMode::Ecb => self.ecb(buf, false),
                ChainMode::Cbc => self.cbc_decrypt(buf),
                ChainMode::Cfb => self.cfb(buf, false),
                ChainMode::Ofb => self.ofb(buf),
                ChainMode::Ctr => self.ctr(buf),
                ChainMode::CbcMac => self.cbc_mac(buf),
            }
        }
    }
}
