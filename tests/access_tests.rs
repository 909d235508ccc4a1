mod common;

use std::{
    sync::{Arc, Mutex, OnceLock, Weak},
    time::Duration,
};

use alloy::primitives::Address;
use async_trait::async_trait;
use common::*;
use interceptor_core::{
    access::{
        connections::access_request_kind, get_associated_addresses, verify_access, AccessSettings, AccessStatus,
        ConnectionManager, DeclarativeNetRequestBlockMode, SocketId, WebsiteAccessArray, WebsiteNotification,
    },
    config::InterceptorConfig,
    errors::{ClientError, InterceptorError, RequestError},
    traits::{AccessRequestPrompt, ExtensionIcon, WebsiteNotifier},
    types::Website,
};

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(SocketId, WebsiteNotification)>>>,
}

impl RecordingNotifier {
    fn methods(&self) -> Vec<&'static str> {
        self.sent.lock().unwrap().iter().map(|(_, notification)| notification.method()).collect()
    }

    fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl WebsiteNotifier for RecordingNotifier {
    async fn notify(&self, socket: SocketId, notification: WebsiteNotification) -> Result<(), ClientError> {
        self.sent.lock().unwrap().push((socket, notification));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingIcon {
    updates: Arc<Mutex<Vec<(u64, AccessStatus)>>>,
}

#[async_trait]
impl ExtensionIcon for RecordingIcon {
    async fn update(&self, tab_id: u64, status: AccessStatus) {
        self.updates.lock().unwrap().push((tab_id, status));
    }
}

#[derive(Clone, Default)]
struct RecordingPrompt {
    prompts: Arc<Mutex<Vec<(u64, String, Option<Address>)>>>,
}

#[async_trait]
impl AccessRequestPrompt for RecordingPrompt {
    async fn prompt(&self, request_id: u64, website: &Website, address: Option<Address>) -> Result<(), ClientError> {
        self.prompts.lock().unwrap().push((request_id, website.website_origin.clone(), address));
        Ok(())
    }
}

fn website() -> Website {
    Website::from_origin(WEBSITE_ORIGIN)
}

fn settings() -> AccessSettings {
    let metadata = metadata();
    AccessSettings {
        active_address: Some(ALICE),
        active_chain_id: 1,
        simulation_mode: true,
        use_signers_address_as_active_address: false,
        website_access: WebsiteAccessArray::default(),
        active_addresses: vec![metadata.get(ALICE).unwrap().clone(), metadata.get(CAROL).unwrap().clone()],
    }
}

const SOCKET: SocketId = SocketId { tab_id: 7, connection_name: 1 };

#[test]
fn test_disabled_interceptor_wins() {
    let mut settings = settings();
    settings.website_access.set_address_access(&website(), ALICE, true);
    settings.website_access.set_address_access(&website(), CAROL, true);
    settings.website_access.set_interceptor_disabled(&website(), true);

    for address in [None, Some(ALICE), Some(CAROL), Some(BOB)] {
        assert_eq!(
            verify_access(false, true, WEBSITE_ORIGIN, address, &settings),
            AccessStatus::InterceptorDisabled
        );
    }
    let entry = settings.website_access.find(WEBSITE_ORIGIN).unwrap();
    assert_eq!(entry.declarative_net_request_block_mode, DeclarativeNetRequestBlockMode::BlockAll);
}

#[test]
fn test_access_decisions() {
    let mut settings = settings();

    // nothing recorded yet
    assert_eq!(verify_access(false, true, WEBSITE_ORIGIN, Some(ALICE), &settings), AccessStatus::AskAccess);
    assert_eq!(verify_access(false, false, WEBSITE_ORIGIN, Some(ALICE), &settings), AccessStatus::NoAccess);

    settings.website_access.set_website_access(&website(), true);
    // ALICE does not ask for individual access, CAROL does
    assert_eq!(verify_access(false, true, WEBSITE_ORIGIN, Some(ALICE), &settings), AccessStatus::HasAccess);
    assert_eq!(verify_access(false, true, WEBSITE_ORIGIN, Some(CAROL), &settings), AccessStatus::AskAccess);
    assert_eq!(verify_access(false, true, WEBSITE_ORIGIN, None, &settings), AccessStatus::HasAccess);

    settings.website_access.set_address_access(&website(), ALICE, false);
    assert_eq!(verify_access(false, true, WEBSITE_ORIGIN, Some(ALICE), &settings), AccessStatus::NoAccess);

    // a site level denial covers every address
    settings.website_access.set_address_access(&website(), CAROL, true);
    settings.website_access.set_website_access(&website(), false);
    assert_eq!(verify_access(false, true, WEBSITE_ORIGIN, Some(CAROL), &settings), AccessStatus::NoAccess);

    // an approved connection short-circuits
    assert_eq!(verify_access(true, false, WEBSITE_ORIGIN, Some(CAROL), &settings), AccessStatus::HasAccess);
}

#[test]
fn test_associated_addresses_are_deduplicated() {
    let mut settings = settings();
    settings.website_access.set_address_access(&website(), CAROL, true);
    settings.website_access.set_address_access(&website(), ALICE, true);
    settings.website_access.set_address_access(&website(), BOB, false);

    let addresses = get_associated_addresses(&settings, WEBSITE_ORIGIN, Some(ALICE));
    assert_eq!(addresses, vec![ALICE, CAROL]);

    let addresses = get_associated_addresses(&settings, "https://other.example", Some(BOB));
    assert_eq!(addresses, vec![ALICE, BOB]);
}

#[test]
fn test_access_table_json() {
    let json = r#"[
        {
            "website": { "websiteOrigin": "https://app.example.org", "title": "Example" },
            "access": true,
            "addressAccess": [{ "address": "0xa11ce00000000000000000000000000000000001", "access": false }],
            "declarativeNetRequestBlockMode": "disabled"
        },
        {
            "website": { "websiteOrigin": "https://blocked.example" },
            "interceptorDisabled": true,
            "declarativeNetRequestBlockMode": "block-all"
        }
    ]"#;
    let mut table: WebsiteAccessArray = serde_json::from_str(json).unwrap();
    assert_eq!(table.find(WEBSITE_ORIGIN).unwrap().address_access(ALICE), Some(false));
    assert!(table.find("https://blocked.example").unwrap().is_interceptor_disabled());

    // unique by address
    table.set_address_access(&website(), ALICE, true);
    let entry = table.find(WEBSITE_ORIGIN).unwrap();
    assert_eq!(entry.address_access.as_ref().unwrap().len(), 1);
    assert_eq!(entry.address_access(ALICE), Some(true));

    assert!(table.remove_website("https://blocked.example"));
    assert!(!table.remove_website("https://blocked.example"));

    let value = serde_json::to_value(&table).unwrap();
    assert_eq!(value[0]["website"]["websiteOrigin"], WEBSITE_ORIGIN);
    assert_eq!(value[0]["declarativeNetRequestBlockMode"], "disabled");
}

#[tokio::test]
async fn test_connect_sends_notifications_in_order() {
    let notifier = RecordingNotifier::default();
    let icon = RecordingIcon::default();
    let manager = ConnectionManager::new(notifier.clone(), icon.clone(), RecordingPrompt::default());
    manager.open(SOCKET, website()).await;

    let mut settings = settings();
    settings.website_access.set_website_access(&website(), true);

    let status = manager.verify_access(SOCKET, true, WEBSITE_ORIGIN, Some(ALICE), &settings).await;
    assert_eq!(status, AccessStatus::HasAccess);
    assert_eq!(notifier.methods(), vec!["connect", "accountsChanged", "chainChanged"]);
    assert_eq!(icon.updates.lock().unwrap().as_slice(), &[(7, AccessStatus::HasAccess)]);

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent[0].1, WebsiteNotification::Connect("0x1".into()));
    assert_eq!(sent[1].1, WebsiteNotification::AccountsChanged(vec![ALICE]));
    assert_eq!(
        serde_json::to_value(&sent[1].1).unwrap(),
        serde_json::json!({ "method": "accountsChanged", "result": [ALICE] })
    );

    // already approved, nothing is sent again
    notifier.clear();
    manager.verify_access(SOCKET, true, WEBSITE_ORIGIN, Some(ALICE), &settings).await;
    assert!(notifier.methods().is_empty());
}

#[tokio::test]
async fn test_connect_mirrors_signer_outside_simulation_mode() {
    let notifier = RecordingNotifier::default();
    let manager = ConnectionManager::new(notifier.clone(), RecordingIcon::default(), RecordingPrompt::default());
    manager.open(SOCKET, website()).await;

    let mut settings = settings();
    settings.simulation_mode = false;
    settings.website_access.set_website_access(&website(), true);
    manager.connect(SOCKET, &settings, Some(ALICE)).await;

    assert_eq!(
        notifier.methods(),
        vec![
            "connect",
            "accountsChanged",
            "chainChanged",
            "request_signer_to_eth_requestAccounts",
            "request_signer_chainId",
        ]
    );
}

#[tokio::test]
async fn test_sweep_disconnects_revoked_website() {
    let notifier = RecordingNotifier::default();
    let icon = RecordingIcon::default();
    let manager = ConnectionManager::new(notifier.clone(), icon.clone(), RecordingPrompt::default());
    manager.open(SOCKET, website()).await;

    let mut settings = settings();
    settings.website_access.set_website_access(&website(), true);
    manager.update_website_approval_accesses(&settings).await;
    assert!(manager.connection(SOCKET).await.unwrap().approved);

    notifier.clear();
    settings.website_access.set_interceptor_disabled(&website(), true);
    manager.update_website_approval_accesses(&settings).await;
    assert_eq!(notifier.methods(), vec!["disconnect"]);
    assert!(!manager.connection(SOCKET).await.unwrap().approved);
    assert_eq!(icon.updates.lock().unwrap().last(), Some(&(7, AccessStatus::InterceptorDisabled)));
}

#[tokio::test]
async fn test_sweep_reports_active_address_change() {
    let notifier = RecordingNotifier::default();
    let manager = ConnectionManager::new(notifier.clone(), RecordingIcon::default(), RecordingPrompt::default());
    manager.open(SOCKET, website()).await;

    let mut settings = settings();
    settings.website_access.set_website_access(&website(), true);
    settings.website_access.set_address_access(&website(), BOB, true);
    manager.update_website_approval_accesses(&settings).await;

    notifier.clear();
    settings.active_address = Some(BOB);
    manager.update_website_approval_accesses(&settings).await;
    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent, vec![(SOCKET, WebsiteNotification::AccountsChanged(vec![BOB]))]);
}

#[tokio::test]
async fn test_access_prompt_opens_once() {
    let prompt = RecordingPrompt::default();
    let manager = ConnectionManager::new(RecordingNotifier::default(), RecordingIcon::default(), prompt.clone());
    let other_socket = SocketId { tab_id: 8, connection_name: 1 };
    manager.open(SOCKET, website()).await;
    manager.open(other_socket, website()).await;
    manager.set_wants_to_connect(SOCKET, true).await;
    manager.set_wants_to_connect(other_socket, true).await;

    let settings = settings();
    manager.update_website_approval_accesses(&settings).await;
    manager.update_website_approval_accesses(&settings).await;

    let prompts = prompt.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].1, WEBSITE_ORIGIN);
    assert_eq!(prompts[0].2, Some(ALICE));

    let kind = access_request_kind(WEBSITE_ORIGIN, Some(ALICE));
    assert_eq!(manager.access_requests().pending_id(&kind).await, Some(prompts[0].0));

    let err = manager.request_access(&website(), Some(ALICE)).await.unwrap_err();
    assert!(matches!(err, InterceptorError::Request(RequestError::AlreadyPending { .. })));
}

#[tokio::test]
async fn test_access_request_resolves_waiter() {
    let manager =
        ConnectionManager::new(RecordingNotifier::default(), RecordingIcon::default(), RecordingPrompt::default());
    let request = manager.request_access(&website(), Some(CAROL)).await.unwrap();
    let id = request.id;

    manager.resolve_access_request(id, true).await.unwrap();
    let granted = manager.wait_for_access(request).await.unwrap();
    assert!(granted);
    assert_eq!(manager.resolve_access_request(id, true).await, Err(RequestError::UnknownRequest(id)));

    // a new request can be opened once the previous one is settled
    assert!(manager.request_access(&website(), Some(CAROL)).await.is_ok());
}

#[tokio::test]
async fn test_unanswered_access_request_times_out_as_denied() {
    let config = InterceptorConfig::from_json_str(r#"{ "accessRequestTimeoutMs": 20 }"#).unwrap();
    let manager =
        ConnectionManager::new(RecordingNotifier::default(), RecordingIcon::default(), RecordingPrompt::default())
            .with_request_timeout(config.access_request_timeout());
    let request = manager.request_access(&website(), Some(CAROL)).await.unwrap();
    let id = request.id;

    assert!(!manager.wait_for_access(request).await.unwrap());
    assert!(manager.access_requests().is_empty().await);
    assert_eq!(manager.resolve_access_request(id, true).await, Err(RequestError::UnknownRequest(id)));
}

#[tokio::test]
async fn test_answer_to_sweep_prompt_connects_on_next_sweep() {
    let notifier = RecordingNotifier::default();
    let prompt = RecordingPrompt::default();
    let manager = ConnectionManager::new(notifier.clone(), RecordingIcon::default(), prompt.clone());
    manager.open(SOCKET, website()).await;
    manager.set_wants_to_connect(SOCKET, true).await;

    let mut settings = settings();
    manager.update_website_approval_accesses(&settings).await;
    let request_id = prompt.prompts.lock().unwrap()[0].0;

    let decision = manager.resolve_access_request(request_id, true).await.unwrap();
    assert_eq!(decision.website, website());
    assert_eq!(decision.address, Some(ALICE));
    assert!(manager.access_requests().is_empty().await);

    decision.record(&mut settings.website_access);
    manager.update_website_approval_accesses(&settings).await;
    assert_eq!(notifier.methods(), vec!["connect", "accountsChanged", "chainChanged"]);
    assert!(manager.connection(SOCKET).await.unwrap().approved);
    assert_eq!(prompt.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ignored_sweep_prompt_expires_and_is_asked_again() {
    let prompt = RecordingPrompt::default();
    let manager = ConnectionManager::new(RecordingNotifier::default(), RecordingIcon::default(), prompt.clone())
        .with_request_timeout(Duration::from_millis(10));
    manager.open(SOCKET, website()).await;
    manager.set_wants_to_connect(SOCKET, true).await;

    let settings = settings();
    manager.update_website_approval_accesses(&settings).await;
    let expired_id = prompt.prompts.lock().unwrap()[0].0;
    tokio::time::sleep(Duration::from_millis(40)).await;

    manager.update_website_approval_accesses(&settings).await;
    let prompts = prompt.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert_ne!(prompts[1].0, expired_id);
    assert_eq!(manager.access_requests().len().await, 1);

    assert_eq!(
        manager.resolve_access_request(expired_id, true).await,
        Err(RequestError::UnknownRequest(expired_id))
    );
    assert!(manager.resolve_access_request(prompts[1].0, false).await.is_ok());
}

type ClosingManager = ConnectionManager<ClosingNotifier, RecordingIcon, RecordingPrompt>;

/// Closes the socket it fails to reach, from inside the notification
#[derive(Clone, Default)]
struct ClosingNotifier {
    manager: Arc<OnceLock<Weak<ClosingManager>>>,
}

#[async_trait]
impl WebsiteNotifier for ClosingNotifier {
    async fn notify(&self, socket: SocketId, _notification: WebsiteNotification) -> Result<(), ClientError> {
        if let Some(manager) = self.manager.get().and_then(Weak::upgrade) {
            manager.close(socket).await;
        }
        Err(ClientError::Connectivity("port closed".into()))
    }
}

#[tokio::test]
async fn test_notifier_may_call_back_into_manager() {
    let notifier = ClosingNotifier::default();
    let manager = Arc::new(ConnectionManager::new(notifier.clone(), RecordingIcon::default(), RecordingPrompt::default()));
    notifier.manager.set(Arc::downgrade(&manager)).unwrap();
    manager.open(SOCKET, website()).await;

    let mut settings = settings();
    settings.website_access.set_website_access(&website(), true);
    tokio::time::timeout(Duration::from_secs(1), manager.update_website_approval_accesses(&settings))
        .await
        .expect("sweep must not deadlock");
    assert!(manager.connection(SOCKET).await.is_none());
}
