//! Access decisions
//!
//! Pure functions over [`AccessSettings`]. Side effects of a decision (notifying
//! the website, updating the icon) live in [`super::connections`].

use alloy::primitives::Address;

use super::types::{AccessLookup, AccessSettings, AccessStatus};

/// Consults the access table for `origin`, and `address` when one is given
///
/// - a disabled interceptor wins over everything
/// - `access: false` on the site denies every address
/// - a per-address decision wins over the address' own flag
/// - an address that does not ask for individual access is granted once the site is
pub fn lookup_access(settings: &AccessSettings, origin: &str, address: Option<Address>) -> AccessLookup {
    let Some(website) = settings.website_access.find(origin) else {
        return AccessLookup::NotFound;
    };
    if website.is_interceptor_disabled() {
        return AccessLookup::InterceptorDisabled;
    }
    match website.access {
        None => AccessLookup::NotFound,
        Some(false) => AccessLookup::NoAccess,
        Some(true) => {
            let Some(address) = address else {
                return AccessLookup::HasAccess;
            };
            match website.address_access(address) {
                Some(true) => AccessLookup::HasAccess,
                Some(false) => AccessLookup::NoAccess,
                None if settings.skips_address_access(address) => AccessLookup::HasAccess,
                None => AccessLookup::NotFound,
            }
        }
    }
}

/// Decides whether a request from `origin` may proceed
///
/// A connection that is already approved short-circuits to
/// [`AccessStatus::HasAccess`]. Otherwise "not found" becomes
/// [`AccessStatus::AskAccess`] only when `ask_access_if_unknown` is set.
pub fn verify_access(
    connection_approved: bool,
    ask_access_if_unknown: bool,
    origin: &str,
    address: Option<Address>,
    settings: &AccessSettings,
) -> AccessStatus {
    if connection_approved {
        return AccessStatus::HasAccess;
    }
    lookup_access(settings, origin, address).resolve(ask_access_if_unknown)
}

/// Addresses `origin` may see, without duplicates
///
/// Combines the user's addresses that do not ask for individual access, addresses
/// explicitly granted to the website, and the active address.
pub fn get_associated_addresses(settings: &AccessSettings, origin: &str, active_address: Option<Address>) -> Vec<Address> {
    let mut addresses: Vec<Address> = Vec::new();
    let mut push = |address: Address| {
        if !addresses.contains(&address) {
            addresses.push(address);
        }
    };

    for entry in &settings.active_addresses {
        if settings.skips_address_access(entry.address) {
            push(entry.address);
        }
    }
    if let Some(granted) = settings.website_access.find(origin).and_then(|website| website.address_access.as_ref()) {
        for entry in granted.iter().filter(|entry| entry.access) {
            push(entry.address);
        }
    }
    if let Some(active_address) = active_address {
        push(active_address);
    }
    addresses
}
