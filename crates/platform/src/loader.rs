//! Background mesh loading. The read + parse runs on a worker thread and the
//! outcome is handed to a delivery callback, which the event loop wires to
//! its proxy. This is the only asynchronous step in a viewer's life.

use std::{io, path::PathBuf, thread};

use anyhow::Result;
use asset::MeshData;
use corelib::LoadTicket;
use winit::window::WindowId;

/// Result of one load request, stamped with the ticket it was issued for.
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub result: Result<MeshData>,
}

/// User events posted to the event loop.
pub enum ViewerEvent {
    MeshLoaded {
        window_id: WindowId,
        outcome: LoadOutcome,
    },
}

/// Read and build the mesh at `path` off the event loop thread. There is no
/// timeout and no cancellation; stale outcomes are filtered by ticket.
pub fn spawn_load<F>(ticket: LoadTicket, path: PathBuf, deliver: F) -> io::Result<()>
where
    F: FnOnce(LoadOutcome) + Send + 'static,
{
    thread::Builder::new()
        .name(format!("obj-loader-{}", ticket.generation()))
        .spawn(move || {
            log::debug!("Loading {}", path.display());
            let result = asset::load_obj_from_path(&path);
            deliver(LoadOutcome { ticket, result });
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{ViewerConfig, ViewerState};
    use std::{sync::mpsc, time::Duration};

    fn receive(path: PathBuf) -> LoadOutcome {
        let mut state = ViewerState::new(ViewerConfig::default(), 100, 100);
        let ticket = state.begin_load();
        let (tx, rx) = mpsc::channel();
        spawn_load(ticket, path, move |outcome| {
            tx.send(outcome).ok();
        })
        .expect("spawn loader");
        rx.recv_timeout(Duration::from_secs(10)).expect("loader finished")
    }

    #[test]
    fn delivers_parsed_mesh() {
        let path = std::env::temp_dir().join(format!("meshview-loader-{}.obj", std::process::id()));
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let outcome = receive(path.clone());
        std::fs::remove_file(&path).ok();
        assert_eq!(outcome.ticket.generation(), 1);
        assert_eq!(outcome.result.expect("mesh").triangle_count(), 1);
    }

    #[test]
    fn delivers_read_errors() {
        let outcome = receive(PathBuf::from("/definitely/not/here.obj"));
        assert!(outcome.result.is_err());
    }
}
