//! Entity resolution: mapping a block's client reference onto the roster.
//!
//! Resolution is exact-on-canonical-name only. Near matches ("Maria" vs
//! "Maria Garcia") stay distinct; silently merging records on a guess is
//! worse than asking the owner to restate the name.

use jardin_core::domain::client::Client;
use jardin_core::extract::Block;
use jardin_core::DomainError;

/// Outcome of resolving one block against the roster.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// The referenced client exists; apply the block to it.
    Existing(Client),
    /// A new-client block for an unseen canonical name: the client to insert.
    CreateNew(Client),
    /// The block references a client nobody knows. The block is skipped.
    Unknown { name: String },
}

/// Resolve `block` given the roster's answer for its canonical name.
/// The caller performs the lookup (turn-local creations first, then the
/// store) and passes the result in, keeping this function pure.
pub fn resolve(block: &Block, existing: Option<Client>) -> Result<Resolution, DomainError> {
    match (block, existing) {
        // A repeated introduction reuses the existing record as-is.
        (_, Some(client)) => Ok(Resolution::Existing(client)),
        (Block::NewClient(fields), None) => {
            let mut client = Client::create(&fields.name)?;
            client.phone = fields.phone.clone();
            client.email = fields.email.clone();
            client.address = fields.address.clone();
            if let Some(language) = fields.language {
                client.language = language;
            }
            client.notes = fields.notes.clone();
            if client.phone.is_none() && client.email.is_some() {
                client.contact_preference = jardin_core::MessageChannel::Email;
            }
            Ok(Resolution::CreateNew(client))
        }
        (block, None) => {
            Ok(Resolution::Unknown { name: block.client_reference().to_string() })
        }
    }
}
