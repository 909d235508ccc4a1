//! Live website connections
//!
//! A connection is opened when a website's script opens a port and dropped when
//! the port closes. Its `approved` flag only caches what the website was last told,
//! the access table stays the source of truth and is re-evaluated by
//! [`ConnectionManager::update_website_approval_accesses`] whenever settings change.

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    types::{AccessLookup, AccessSettings, AccessStatus, WebsiteAccessArray},
    verify::{lookup_access, verify_access},
};
use crate::{
    errors::{InterceptorError, RequestError},
    pending::{PendingRequest, PendingRequests},
    traits::{AccessRequestPrompt, ExtensionIcon, WebsiteNotifier},
    types::Website,
};

/// Identifies one port of one tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketId {
    pub tab_id: u64,
    pub connection_name: u64,
}

/// Live connection of a website's script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteConnection {
    pub socket: SocketId,
    pub website: Website,
    /// The website was last told it is connected
    pub approved: bool,
    /// The website asked to connect, e.g. through `eth_requestAccounts`
    pub wants_to_connect: bool,
    /// Address the website was last told about
    pub notified_address: Option<Address>,
}

/// Messages sent to a website's script, serialised as `{ "method", "result" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "result")]
pub enum WebsiteNotification {
    /// Chain id as a hex quantity
    #[serde(rename = "connect")]
    Connect(String),
    #[serde(rename = "accountsChanged")]
    AccountsChanged(Vec<Address>),
    #[serde(rename = "chainChanged")]
    ChainChanged(String),
    #[serde(rename = "request_signer_to_eth_requestAccounts")]
    RequestSignerToEthRequestAccounts,
    #[serde(rename = "request_signer_chainId")]
    RequestSignerChainId,
    #[serde(rename = "disconnect")]
    Disconnect,
}

impl WebsiteNotification {
    pub fn method(&self) -> &'static str {
        match self {
            WebsiteNotification::Connect(_) => "connect",
            WebsiteNotification::AccountsChanged(_) => "accountsChanged",
            WebsiteNotification::ChainChanged(_) => "chainChanged",
            WebsiteNotification::RequestSignerToEthRequestAccounts => "request_signer_to_eth_requestAccounts",
            WebsiteNotification::RequestSignerChainId => "request_signer_chainId",
            WebsiteNotification::Disconnect => "disconnect",
        }
    }
}

fn chain_id_hex(chain_id: u64) -> String {
    format!("{chain_id:#x}")
}

/// Pending request kind of an access request, one per website and address
pub fn access_request_kind(origin: &str, address: Option<Address>) -> String {
    match address {
        Some(address) => format!("access:{origin}:{address}"),
        None => format!("access:{origin}"),
    }
}

/// The user's answer to an access request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub request_id: u64,
    pub website: Website,
    pub address: Option<Address>,
    pub granted: bool,
}

impl AccessDecision {
    /// Writes the answer into `table`, per address when the request named one
    pub fn record(&self, table: &mut WebsiteAccessArray) {
        match self.address {
            Some(address) => table.set_address_access(&self.website, address, self.granted),
            None => table.set_website_access(&self.website, self.granted),
        }
    }
}

struct OpenAccessRequest {
    website: Website,
    address: Option<Address>,
    /// Held for requests the sweep opened, nobody else waits for those
    waiter: Option<PendingRequest<bool>>,
}

/// Side effect decided under the connections lock, carried out after releasing it
enum Effect {
    Connect { socket: SocketId, address: Option<Address> },
    Disconnect { socket: SocketId, status: AccessStatus },
    AccountsChanged { socket: SocketId, address: Option<Address> },
    Prompt { website: Website, address: Option<Address> },
}

fn mark_connected(connection: &mut WebsiteConnection, address: Option<Address>) -> Effect {
    connection.approved = true;
    connection.notified_address = address;
    info!(origin = %connection.website.website_origin, ?address, "website connected");
    Effect::Connect { socket: connection.socket, address }
}

fn mark_disconnected(connection: &mut WebsiteConnection, status: AccessStatus) -> Effect {
    connection.approved = false;
    connection.notified_address = None;
    info!(origin = %connection.website.website_origin, "website disconnected");
    Effect::Disconnect { socket: connection.socket, status }
}

/// Tracks live connections and keeps them in sync with the access table
///
/// Collaborators are only called once the connections lock is released, so they
/// may call back into the manager.
pub struct ConnectionManager<N, I, P> {
    notifier: N,
    icon: I,
    prompt: P,
    connections: Mutex<BTreeMap<SocketId, WebsiteConnection>>,
    access_requests: PendingRequests<bool>,
    open_requests: Mutex<HashMap<u64, OpenAccessRequest>>,
}

impl<N, I, P> ConnectionManager<N, I, P>
where
    N: WebsiteNotifier,
    I: ExtensionIcon,
    P: AccessRequestPrompt,
{
    pub fn new(notifier: N, icon: I, prompt: P) -> Self {
        Self {
            notifier,
            icon,
            prompt,
            connections: Mutex::new(BTreeMap::new()),
            access_requests: PendingRequests::new(),
            open_requests: Mutex::new(HashMap::new()),
        }
    }

    /// How long an access request waits for the user, see `InterceptorConfig::access_request_timeout`
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.access_requests = PendingRequests::with_timeout(timeout);
        self
    }

    /// Registers a freshly opened port
    pub async fn open(&self, socket: SocketId, website: Website) {
        let connection =
            WebsiteConnection { socket, website, approved: false, wants_to_connect: false, notified_address: None };
        self.connections.lock().await.insert(socket, connection);
    }

    /// Forgets a closed port
    pub async fn close(&self, socket: SocketId) -> Option<WebsiteConnection> {
        self.connections.lock().await.remove(&socket)
    }

    pub async fn set_wants_to_connect(&self, socket: SocketId, wants_to_connect: bool) {
        if let Some(connection) = self.connections.lock().await.get_mut(&socket) {
            connection.wants_to_connect = wants_to_connect;
        }
    }

    pub async fn connection(&self, socket: SocketId) -> Option<WebsiteConnection> {
        self.connections.lock().await.get(&socket).cloned()
    }

    pub async fn connections(&self) -> Vec<WebsiteConnection> {
        self.connections.lock().await.values().cloned().collect()
    }

    pub fn access_requests(&self) -> &PendingRequests<bool> {
        &self.access_requests
    }

    async fn send(&self, socket: SocketId, notification: WebsiteNotification) {
        let method = notification.method();
        if let Err(err) = self.notifier.notify(socket, notification).await {
            warn!(?socket, method, error = %err, "failed to notify website");
        }
    }

    async fn announce_disconnect(&self, socket: SocketId, status: AccessStatus) {
        self.icon.update(socket.tab_id, status).await;
        self.send(socket, WebsiteNotification::Disconnect).await;
    }

    async fn apply(&self, effect: Effect, settings: &AccessSettings) {
        match effect {
            Effect::Connect { socket, address } => {
                self.icon.update(socket.tab_id, AccessStatus::HasAccess).await;
                let chain_id = chain_id_hex(settings.active_chain_id);
                self.send(socket, WebsiteNotification::Connect(chain_id.clone())).await;
                self.send(socket, WebsiteNotification::AccountsChanged(address.into_iter().collect())).await;
                self.send(socket, WebsiteNotification::ChainChanged(chain_id)).await;
                if settings.mirrors_signer() {
                    self.send(socket, WebsiteNotification::RequestSignerToEthRequestAccounts).await;
                    self.send(socket, WebsiteNotification::RequestSignerChainId).await;
                }
            }
            Effect::Disconnect { socket, status } => self.announce_disconnect(socket, status).await,
            Effect::AccountsChanged { socket, address } => {
                self.send(socket, WebsiteNotification::AccountsChanged(address.into_iter().collect())).await;
            }
            Effect::Prompt { website, address } => self.prompt_once(&website, address).await,
        }
    }

    /// Checks whether `socket` may proceed, connecting it when access is granted
    ///
    /// Unknown sockets are checked against the access table alone.
    pub async fn verify_access(
        &self,
        socket: SocketId,
        ask_access_if_unknown: bool,
        origin: &str,
        address: Option<Address>,
        settings: &AccessSettings,
    ) -> AccessStatus {
        let (status, effect) = {
            let mut connections = self.connections.lock().await;
            let connection = connections.get_mut(&socket);
            let approved = connection.as_ref().is_some_and(|connection| connection.approved);
            let status = verify_access(approved, ask_access_if_unknown, origin, address, settings);
            let effect = match connection {
                Some(connection) if status == AccessStatus::HasAccess && !approved => {
                    Some(mark_connected(connection, address.or(settings.active_address)))
                }
                _ => None,
            };
            (status, effect)
        };
        if let Some(effect) = effect {
            self.apply(effect, settings).await;
        }
        status
    }

    /// Marks `socket` connected and sends the connect notifications
    pub async fn connect(&self, socket: SocketId, settings: &AccessSettings, address: Option<Address>) {
        let effect = self.connections.lock().await.get_mut(&socket).map(|connection| mark_connected(connection, address));
        if let Some(effect) = effect {
            self.apply(effect, settings).await;
        }
    }

    /// Marks `socket` disconnected and sends `disconnect`
    pub async fn disconnect(&self, socket: SocketId) {
        let effect = self
            .connections
            .lock()
            .await
            .get_mut(&socket)
            .map(|connection| mark_disconnected(connection, AccessStatus::NoAccess));
        if let Some(Effect::Disconnect { socket, status }) = effect {
            self.announce_disconnect(socket, status).await;
        }
    }

    /// Opens an access request for `website`, prompting the user
    ///
    /// # Errors
    /// [`RequestError::AlreadyPending`] while a request for the same website and
    /// address is outstanding, or the prompt's own failure.
    pub async fn request_access(
        &self,
        website: &Website,
        address: Option<Address>,
    ) -> Result<PendingRequest<bool>, InterceptorError> {
        let request = self.access_requests.register(access_request_kind(&website.website_origin, address)).await?;
        let id = request.id;
        self.open_requests
            .lock()
            .await
            .insert(id, OpenAccessRequest { website: website.clone(), address, waiter: None });

        if let Err(err) = self.prompt.prompt(id, website, address).await {
            self.open_requests.lock().await.remove(&id);
            self.access_requests.cancel(id).await?;
            return Err(err.into());
        }
        Ok(request)
    }

    /// Waits for the user's answer, a timed out request counts as denied
    pub async fn wait_for_access(&self, request: PendingRequest<bool>) -> Result<bool, RequestError> {
        let id = request.id;
        let result = self.access_requests.wait(request).await;
        self.open_requests.lock().await.remove(&id);
        match result {
            Err(RequestError::TimedOut(id)) => {
                debug!(id, "access request timed out");
                Ok(false)
            }
            result => result,
        }
    }

    /// Delivers the user's answer to an access request
    ///
    /// The returned decision still has to be recorded in the access table, after
    /// which [`Self::update_website_approval_accesses`] connects the website.
    ///
    /// # Errors
    /// [`RequestError::UnknownRequest`] for requests that were already settled, and
    /// [`RequestError::TimedOut`] for answers given after the deadline.
    pub async fn resolve_access_request(&self, request_id: u64, granted: bool) -> Result<AccessDecision, RequestError> {
        let open = self.open_requests.lock().await.remove(&request_id);
        match self.access_requests.resolve(request_id, granted).await {
            Ok(()) => {}
            // whoever asked stopped waiting, the answer still stands
            Err(RequestError::Dropped(id)) => debug!(id, "access request answered without a waiter"),
            Err(err) => return Err(err),
        }
        let open = open.ok_or(RequestError::UnknownRequest(request_id))?;
        Ok(AccessDecision { request_id, website: open.website, address: open.address, granted })
    }

    async fn expire_access_requests(&self) {
        let expired = self.access_requests.expire_overdue().await;
        if expired.is_empty() {
            return;
        }
        let mut open_requests = self.open_requests.lock().await;
        for id in expired {
            if let Some(request) = open_requests.remove(&id) {
                let opened_by_sweep = request.waiter.is_some();
                debug!(id, origin = %request.website.website_origin, opened_by_sweep, "access request expired unanswered");
            }
        }
    }

    async fn prompt_once(&self, website: &Website, address: Option<Address>) {
        match self.request_access(website, address).await {
            Ok(request) => {
                debug!(id = request.id, origin = %website.website_origin, "access request opened");
                // already answered if the entry is gone
                if let Some(open) = self.open_requests.lock().await.get_mut(&request.id) {
                    open.waiter = Some(request);
                }
            }
            Err(InterceptorError::Request(RequestError::AlreadyPending { kind })) => {
                debug!(kind = %kind, "access request already outstanding")
            }
            Err(err) => warn!(origin = %website.website_origin, error = %err, "failed to open access request"),
        }
    }

    /// Re-evaluates every live connection against `settings`
    ///
    /// Connects sockets that gained access, disconnects sockets that lost it, tells
    /// connected sockets about a changed active address and opens one access request
    /// for sockets that want to connect but have no decision recorded. Requests left
    /// unanswered past their deadline are dropped first, so the next sweep asks again.
    pub async fn update_website_approval_accesses(&self, settings: &AccessSettings) {
        self.expire_access_requests().await;

        let address = settings.active_address;
        let mut effects = Vec::new();
        {
            let mut connections = self.connections.lock().await;
            for connection in connections.values_mut() {
                let lookup = lookup_access(settings, &connection.website.website_origin, address);
                match lookup {
                    AccessLookup::HasAccess if !connection.approved => {
                        effects.push(mark_connected(connection, address));
                    }
                    AccessLookup::HasAccess => {
                        if connection.notified_address != address {
                            connection.notified_address = address;
                            effects.push(Effect::AccountsChanged { socket: connection.socket, address });
                        }
                    }
                    AccessLookup::NoAccess | AccessLookup::InterceptorDisabled => {
                        if connection.approved {
                            effects.push(mark_disconnected(connection, lookup.resolve(false)));
                        }
                    }
                    AccessLookup::NotFound => {
                        if connection.approved {
                            effects.push(mark_disconnected(connection, AccessStatus::NoAccess));
                        }
                        if connection.wants_to_connect {
                            effects.push(Effect::Prompt { website: connection.website.clone(), address });
                        }
                    }
                }
            }
        }
        for effect in effects {
            self.apply(effect, settings).await;
        }
    }
}
