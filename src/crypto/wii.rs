//! Wii disc partition crypto.
//!
//! ## Title key
//! The ticket at the start of each partition carries the title key
//! encrypted with the common key, AES-128-CBC, IV = title id (8 bytes)
//! followed by 8 zero bytes.
//!
//! ## Clusters
//! Partition data is stored in 0x8000-byte clusters:
//! ```text
//! [0x0000] hash area (0x400 bytes, encrypted; IV for data at 0x3D0)
//! [0x0400] user data (0x7C00 bytes, AES-128-CBC with the title key)
//! ```

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, KeyIvInit};

use crate::{Error, Result};

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Bytes per encrypted cluster.
pub const CLUSTER_SIZE: u64 = 0x8000;
/// Hash area at the start of each cluster.
pub const HASH_SIZE: u64 = 0x400;
/// Plaintext payload per cluster.
pub const DATA_SIZE: u64 = CLUSTER_SIZE - HASH_SIZE;
/// Offset of the data IV inside the cluster's hash area.
const DATA_IV_OFFSET: usize = 0x3D0;

fn cbc_decrypt(key: &[u8; 16], iv: &[u8; 16], buf: &mut [u8]) {
    let mut decryptor = Aes128CbcDec::new(&(*key).into(), &(*iv).into());
    for block in buf.chunks_exact_mut(16) {
        decryptor.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// Unwrap a partition title key.
pub fn decrypt_title_key(common_key: &[u8; 16], encrypted: &[u8; 16], title_id: &[u8; 8]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(title_id);
    let mut key = *encrypted;
    cbc_decrypt(common_key, &iv, &mut key);
    key
}

/// Decrypt the user data of one full cluster.
pub fn decrypt_cluster(title_key: &[u8; 16], cluster: &[u8]) -> Result<Vec<u8>> {
    if cluster.len() as u64 != CLUSTER_SIZE {
        return Err(Error::UnexpectedEof);
    }
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&cluster[DATA_IV_OFFSET..DATA_IV_OFFSET + 16]);
    let mut data = cluster[HASH_SIZE as usize..].to_vec();
    cbc_decrypt(title_key, &iv, &mut data);
    Ok(data)
}

#[cfg(test)]
pub(crate) fn cbc_encrypt(key: &[u8; 16], iv: &[u8; 16], buf: &mut [u8]) {
    use aes::cipher::BlockEncryptMut;
    let mut encryptor = cbc::Encryptor::<Aes128>::new(&(*key).into(), &(*iv).into());
    for block in buf.chunks_exact_mut(16) {
        encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// Encrypt `data` (at most 0x7C00 bytes) into a cluster, for test images.
#[cfg(test)]
pub(crate) fn encrypt_cluster(title_key: &[u8; 16], data: &[u8], iv: [u8; 16]) -> Vec<u8> {
    let mut cluster = vec![0u8; CLUSTER_SIZE as usize];
    cluster[DATA_IV_OFFSET..DATA_IV_OFFSET + 16].copy_from_slice(&iv);
    cluster[HASH_SIZE as usize..HASH_SIZE as usize + data.len()].copy_from_slice(data);
    cbc_encrypt(title_key, &iv, &mut cluster[HASH_SIZE as usize..]);
    cluster
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_key_unwraps() {
        let common = [0x11; 16];
        let title_id = *b"\x00\x01\x00\x00RSBE";
        let plain = [0xA5; 16];
        let mut iv = [0u8; 16];
        iv[..8].copy_from_slice(&title_id);
        let mut wrapped = plain;
        cbc_encrypt(&common, &iv, &mut wrapped);
        assert_ne!(wrapped, plain);
        assert_eq!(decrypt_title_key(&common, &wrapped, &title_id), plain);
    }

    #[test]
    fn cluster_round_trip() {
        let key = [0x42; 16];
        let data: Vec<u8> = (0..DATA_SIZE).map(|i| (i % 251) as u8).collect();
        let cluster = encrypt_cluster(&key, &data, [7; 16]);
        assert_eq!(decrypt_cluster(&key, &cluster).unwrap(), data);
        assert!(decrypt_cluster(&key, &cluster[..0x100]).is_err());
    }
}
