//! Symmetric decryption used by disc decoders.
//!
//! Only formats whose scheme is public and whose key the user supplies are
//! decrypted in-process. Switch content archives are never decrypted here;
//! they go through [`crate::decrypt`].
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`wii`] | AES-128-CBC title key unwrap and partition cluster decryption |

pub mod wii;
