//! In-memory node and selector doubles for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RefreshError;
use crate::node::{DataNode, NodeSelector};

pub(crate) struct FakeNode {
    name: String,
    rows: Mutex<Result<Vec<String>, String>>,
    delay: Mutex<Option<Duration>>,
    statements: Mutex<Vec<String>>,
    fetches: AtomicUsize,
}

impl FakeNode {
    pub(crate) fn with_rows(name: &str, rows: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            rows: Mutex::new(Ok(rows.iter().map(|r| r.to_string()).collect())),
            delay: Mutex::new(None),
            statements: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        })
    }

    pub(crate) fn fail_with(&self, message: &str) {
        *self.rows.lock().unwrap() = Err(message.to_string());
    }

    pub(crate) fn set_rows(&self, rows: &[&str]) {
        *self.rows.lock().unwrap() = Ok(rows.iter().map(|r| r.to_string()).collect());
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataNode for FakeNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_column(&self, statement: &str) -> Result<Vec<String>, RefreshError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.statements.lock().unwrap().push(statement.to_string());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let rows = self.rows.lock().unwrap().clone();
        rows.map_err(|message| RefreshError::query(self.name.clone(), message))
    }
}

pub(crate) struct FakeSelector {
    node: Mutex<Option<Arc<FakeNode>>>,
    calls: AtomicUsize,
}

impl FakeSelector {
    pub(crate) fn with_node(node: Arc<FakeNode>) -> Arc<Self> {
        Arc::new(Self {
            node: Mutex::new(Some(node)),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn empty() -> Arc<Self> {
        Arc::new(Self {
            node: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_node(&self, node: Option<Arc<FakeNode>>) {
        *self.node.lock().unwrap() = node;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NodeSelector for FakeSelector {
    fn standby_preferred(&self) -> Option<Arc<dyn DataNode>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.node
            .lock()
            .unwrap()
            .clone()
            .map(|node| node as Arc<dyn DataNode>)
    }
}
