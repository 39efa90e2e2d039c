//! Асинхронная граница наблюдателя.
//!
//! Одна задача tokio владеет [`Watcher`] и является его единственным
//! логическим потоком: команды приходят через канал, таймеры дебаунса и
//! готовности ждутся через `sleep_until`.

use crate::error::Result;
use crate::events::{DocumentHandle, EventKind, NodeId};
use crate::services::control::ControlSignal;
use crate::services::watcher::{Watcher, WatcherStats};
use crate::watch_error;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tracing::{debug, info, warn};

enum Command {
    Push {
        kind: EventKind,
        target: Option<NodeId>,
    },
    ControlInput {
        node: NodeId,
        signal: ControlSignal,
    },
    SubtreeMutation(NodeId),
    WhenReady(oneshot::Sender<()>),
    SetActive {
        active: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    Init(DocumentHandle),
    Cleanup(DocumentHandle),
    Stats(oneshot::Sender<WatcherStats>),
    Shutdown,
}

/// Клонируемая ручка для отправки команд задаче наблюдателя
#[derive(Clone)]
pub struct WatcherHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl WatcherHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| watch_error!(service_unavailable, "задача наблюдателя остановлена"))
    }

    pub fn push(&self, kind: EventKind, target: Option<NodeId>) -> Result<()> {
        self.send(Command::Push { kind, target })
    }

    pub fn control_input(&self, node: NodeId, signal: ControlSignal) -> Result<()> {
        self.send(Command::ControlInput { node, signal })
    }

    pub fn subtree_mutation(&self, node: NodeId) -> Result<()> {
        self.send(Command::SubtreeMutation(node))
    }

    pub fn init(&self, document: DocumentHandle) -> Result<()> {
        self.send(Command::Init(document))
    }

    pub fn cleanup(&self, document: DocumentHandle) -> Result<()> {
        self.send(Command::Cleanup(document))
    }

    /// Дождаться, пока очередь не останется пустой целый тик опроса
    pub async fn when_ready(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::WhenReady(tx))?;
        rx.await
            .map_err(|_| watch_error!(service_unavailable, "колбэк готовности отброшен"))
    }

    pub async fn set_active(&self, active: bool) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetActive { active, reply })?;
        rx.await
            .map_err(|_| watch_error!(service_unavailable, "нет ответа от наблюдателя"))?
    }

    pub async fn stats(&self) -> Result<WatcherStats> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Stats(tx))?;
        rx.await
            .map_err(|_| watch_error!(service_unavailable, "нет ответа от наблюдателя"))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }
}

/// Запустить задачу, владеющую наблюдателем
pub fn spawn_watcher(watcher: Watcher) -> (WatcherHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(watcher, rx));
    (WatcherHandle { tx }, task)
}

/// Ветка `select!`, которая никогда не срабатывает без дедлайна
async fn sleep_until_optional(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}

async fn run(mut watcher: Watcher, mut rx: mpsc::UnboundedReceiver<Command>) {
    info!("Задача наблюдателя запущена");

    loop {
        let deadline = watcher.next_deadline();
        tokio::select! {
            biased;

            command = rx.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => apply(&mut watcher, command),
            },
            _ = sleep_until_optional(deadline) => watcher.on_timer(),
        }
    }

    if let Some(document) = watcher.session() {
        debug!("Остановка с активной сессией {}", document);
        watcher.cleanup(document);
    }
    info!("Задача наблюдателя завершена");
}

fn apply(watcher: &mut Watcher, command: Command) {
    match command {
        Command::Push { kind, target } => {
            watcher.push(kind, target);
        }
        Command::ControlInput { node, signal } => {
            watcher.control_input(node, signal);
        }
        Command::SubtreeMutation(node) => {
            watcher.subtree_mutation(node);
        }
        Command::WhenReady(tx) => watcher.when_ready(Box::new(move || {
            let _ = tx.send(());
        })),
        Command::SetActive { active, reply } => {
            let result = watcher.set_active(active);
            if let Err(e) = &result {
                warn!("set_active({}): {}", active, e);
            }
            let _ = reply.send(result);
        }
        Command::Init(document) => watcher.init(document),
        Command::Cleanup(document) => watcher.cleanup(document),
        Command::Stats(tx) => {
            let _ = tx.send(watcher.stats());
        }
        Command::Shutdown => {}
    }

    // Ветка таймера в biased select! проигрывает готовым командам:
    // просроченный дедлайн обслуживается сразу после команды
    if watcher.is_due() {
        watcher.on_timer();
    }
}
