use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// 지갑 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletEventKind {
    Disconnect,
    AccountChanged,
    ChainChanged,
}

impl std::fmt::Display for WalletEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WalletEventKind::Disconnect => "disconnect",
            WalletEventKind::AccountChanged => "account_changed",
            WalletEventKind::ChainChanged => "chain_changed",
        };
        write!(f, "{}", s)
    }
}

/// 브로드캐스트 전용 지갑 이벤트 (영속화하지 않는다)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEvent {
    pub kind: WalletEventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub previous_address: Option<Address>,
    #[serde(default)]
    pub new_address: Option<Address>,
    #[serde(default)]
    pub previous_chain_id: Option<u64>,
    #[serde(default)]
    pub new_chain_id: Option<u64>,
}

impl WalletEvent {
    pub fn disconnect(previous_address: Option<Address>) -> Self {
        Self {
            kind: WalletEventKind::Disconnect,
            timestamp: Utc::now(),
            previous_address,
            new_address: None,
            previous_chain_id: None,
            new_chain_id: None,
        }
    }

    pub fn account_changed(previous: Address, new: Address) -> Self {
        Self {
            kind: WalletEventKind::AccountChanged,
            timestamp: Utc::now(),
            previous_address: Some(previous),
            new_address: Some(new),
            previous_chain_id: None,
            new_chain_id: None,
        }
    }

    pub fn chain_changed(previous: u64, new: u64) -> Self {
        Self {
            kind: WalletEventKind::ChainChanged,
            timestamp: Utc::now(),
            previous_address: None,
            new_address: None,
            previous_chain_id: Some(previous),
            new_chain_id: Some(new),
        }
    }
}

type Handler = Arc<dyn Fn(&WalletEvent) + Send + Sync>;

/// 프로세스 전역 지갑 이벤트 브로커
///
/// fire-and-forget 전달. 구독자 하나가 패닉해도 나머지 구독자 전달은
/// 계속된다. 전달은 `publish` 호출에 대해 동기적으로 일어나므로,
/// 보류 중인 네트워크 응답보다 항상 먼저 상태를 강제할 수 있다.
pub struct WalletEventBroker {
    subscribers: Mutex<HashMap<u64, Handler>>,
    next_id: AtomicU64,
}

impl WalletEventBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// 구독 등록. 반환된 `Subscription`이 드롭되면 해지된다.
    pub fn subscribe(
        self: &Arc<Self>,
        handler: impl Fn(&WalletEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .lock()
            .expect("wallet broker lock poisoned")
            .insert(id, Arc::new(handler));
        debug!("🔔 Wallet event subscriber registered (id={})", id);
        Subscription {
            id,
            broker: Arc::downgrade(self),
        }
    }

    /// 모든 구독자에게 이벤트 전달
    pub fn publish(&self, event: &WalletEvent) {
        // 락을 잡은 채로 핸들러를 부르지 않는다. 핸들러 안에서
        // 구독 해지가 일어나도 안전하도록 스냅샷을 뜬 뒤 실행한다.
        let handlers: Vec<(u64, Handler)> = {
            let subs = self
                .subscribers
                .lock()
                .expect("wallet broker lock poisoned");
            subs.iter().map(|(id, h)| (*id, Arc::clone(h))).collect()
        };

        warn!("📢 Wallet event: {} ({} subscriber(s))", event.kind, handlers.len());

        for (id, handler) in handlers {
            let result = catch_unwind(AssertUnwindSafe(|| handler(event)));
            if result.is_err() {
                error!("💥 Wallet event subscriber {} panicked, continuing delivery", id);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("wallet broker lock poisoned")
            .len()
    }

    fn remove(&self, id: u64) {
        if self
            .subscribers
            .lock()
            .expect("wallet broker lock poisoned")
            .remove(&id)
            .is_some()
        {
            debug!("🔕 Wallet event subscriber removed (id={})", id);
        }
    }
}

/// 구독 핸들. 명시적 해지 또는 드롭으로 해지된다.
pub struct Subscription {
    id: u64,
    broker: Weak<WalletEventBroker>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop impl이 실제 해지를 수행한다
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(broker) = self.broker.upgrade() {
            broker.remove(self.id);
        }
    }
}
