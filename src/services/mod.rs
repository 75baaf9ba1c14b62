// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod linking;
pub mod normalizer;
pub mod password;
pub mod presenter;
pub mod providers;
pub mod session;
pub mod storage;
pub mod token;

pub use linking::IdentityLinker;
pub use password::{DefaultPasswordPolicy, PasswordHasher, PasswordPolicy, Pbkdf2Hasher};
pub use presenter::{JsonApiPresenter, UserPresenter};
pub use providers::{HttpProfileFetcher, ProfileFetcher};
pub use session::{AuthenticatedRequestContext, Session, SessionService};
pub use storage::{DefaultKeyNamer, SigV4Signer, StorageKeyNamer, UploadUrlSigner};
pub use token::TokenCodec;
