use std::sync::mpsc;

use citygrid_shared::city::CellKind;
use citygrid_shared::coords::CellPos;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlanEvent {
    CellPlanned {
        cell: CellPos,
        kind: CellKind,
        structure_parts: usize,
        moved_blocks: u64,
    },
}

pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

pub struct EventReceiver<T> {
    rx: mpsc::Receiver<T>,
}

pub fn channel<T>() -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSender<T> {
    pub fn send(&self, event: T) -> Result<(), mpsc::SendError<T>> {
        self.tx.send(event)
    }
}

impl<T> EventReceiver<T> {
    pub fn try_recv(&self) -> Result<T, mpsc::TryRecvError> {
        self.rx.try_recv()
    }

    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }
}
