//! Engine running on its own thread.
//!
//! Hosts talk to [`EngineService`] through two channels: [`Command`]s in and
//! [`Event`]s out. Project updates that pile up while a pass is running are
//! collapsed to the latest one, and sending a new project cancels the pass
//! in flight. Each project carries a caller-chosen generation that is
//! echoed on the resulting [`Event::Previews`] or [`Event::Failed`], so the
//! host can drop results that are already stale.

use std::sync::mpsc::{Receiver, RecvTimeoutError, SendError, Sender, channel};
use std::thread;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::document::Project;
use crate::evaluator::Engine;
use crate::globals::{CancelToken, CatalogImage, Globals, ProgressMonitor, ViewerModel};
use crate::preview::Previews;
use crate::processor::NodeKind;

/// Requests accepted by the engine thread.
#[derive(Debug)]
pub enum Command {
    Project { project: Project, generation: u64 },
    /// Replace the image catalog.
    Catalog(Vec<CatalogImage>),
    Shutdown,
}

/// Notifications emitted by the engine thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ProgressStarted,
    Progress { amount: f64, message: String },
    ProgressEnded,
    Viewer(ViewerModel),
    Previews { generation: u64, previews: Previews },
    Failed { generation: u64, message: String },
}

/// Log a send to a hung-up channel; the other side is shutting down.
fn log_disconnect<T>(result: Result<(), SendError<T>>, what: &str) {
    if result.is_err() {
        log::debug!("{what} dropped: channel disconnected");
    }
}

/// Globals whose viewer sink forwards to the event channel.
struct ChannelGlobals {
    catalog: Vec<CatalogImage>,
    events: Sender<Event>,
}

impl Globals for ChannelGlobals {
    fn images(&self) -> &[CatalogImage] {
        &self.catalog
    }

    fn set_viewer(&mut self, model: ViewerModel) {
        log_disconnect(self.events.send(Event::Viewer(model)), "viewer event");
    }
}

struct ChannelProgress(Sender<Event>);

impl ProgressMonitor for ChannelProgress {
    fn start(&mut self) {
        log_disconnect(self.0.send(Event::ProgressStarted), "progress event");
    }

    fn progress(&mut self, amount: f64, message: &str) {
        let event = Event::Progress {
            amount,
            message: message.to_owned(),
        };
        log_disconnect(self.0.send(event), "progress event");
    }

    fn end(&mut self) {
        log_disconnect(self.0.send(Event::ProgressEnded), "progress event");
    }
}

/// Commands collected in one wake-up of the engine thread.
#[derive(Debug, Default)]
struct Batch {
    /// Latest queued project and its generation.
    project: Option<(Project, u64)>,
    catalog: Option<Vec<CatalogImage>>,
    shutdown: bool,
}

/// Block for the next command, then take everything else already queued.
///
/// The token is cleared before the queue is drained, so a cancel raised
/// while the batch is collected still stops the pass that follows.
fn next_batch(rx: &Receiver<Command>, token: &CancelToken) -> Option<Batch> {
    let first = rx.recv().ok()?;
    token.reset();
    let mut batch = Batch::default();
    for command in std::iter::once(first).chain(rx.try_iter()) {
        match command {
            Command::Project {
                project,
                generation,
            } => batch.project = Some((project, generation)),
            Command::Catalog(catalog) => batch.catalog = Some(catalog),
            Command::Shutdown => {
                batch.shutdown = true;
                break;
            }
        }
    }
    Some(batch)
}

/// Handle to an engine thread. Dropping it shuts the thread down.
pub struct EngineService {
    commands: Sender<Command>,
    events: Receiver<Event>,
    cancel: CancelToken,
    handle: Option<thread::JoinHandle<()>>,
}

impl EngineService {
    #[must_use]
    pub fn spawn(config: EngineConfig) -> Self {
        let (commands, rx) = channel::<Command>();
        let (tx_events, events) = channel::<Event>();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let handle = thread::spawn(move || {
            let mut engine = Engine::new(config);
            let mut globals = ChannelGlobals {
                catalog: Vec::new(),
                events: tx_events.clone(),
            };
            let mut progress = ChannelProgress(tx_events.clone());

            while let Some(batch) = next_batch(&rx, &token) {
                if batch.shutdown {
                    break;
                }
                if let Some(catalog) = batch.catalog {
                    log::debug!("catalog replaced: {} images", catalog.len());
                    globals.catalog = catalog;
                    engine.invalidate(NodeKind::ImageInput.id());
                }
                let Some((project, generation)) = batch.project else {
                    continue;
                };

                let event = match engine.update(&project, &mut globals, &mut progress, &token) {
                    Ok(previews) => Event::Previews {
                        generation,
                        previews,
                    },
                    Err(e) => {
                        log::error!("update {generation} failed: {e}");
                        Event::Failed {
                            generation,
                            message: e.to_string(),
                        }
                    }
                };
                log_disconnect(tx_events.send(event), "result event");
            }
            log::debug!("engine thread stopped");
        });

        Self {
            commands,
            events,
            cancel,
            handle: Some(handle),
        }
    }

    /// Queue a project for evaluation, cancelling the pass in flight.
    pub fn send_project(&self, project: Project, generation: u64) {
        self.cancel.cancel();
        let command = Command::Project {
            project,
            generation,
        };
        log_disconnect(self.commands.send(command), "project command");
    }

    /// Replace the catalog used by subsequent passes.
    pub fn send_catalog(&self, catalog: Vec<CatalogImage>) {
        log_disconnect(self.commands.send(Command::Catalog(catalog)), "catalog command");
    }

    /// Cancel the pass in flight, if any.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the next event; `None` once the thread is gone.
    #[must_use]
    pub fn recv(&self) -> Option<Event> {
        self.events.recv().ok()
    }

    /// Wait at most `timeout` for the next event.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Event> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Events already emitted, without blocking.
    pub fn try_events(&self) -> impl Iterator<Item = Event> + '_ {
        self.events.try_iter()
    }
}

impl Drop for EngineService {
    fn drop(&mut self) {
        self.cancel.cancel();
        log_disconnect(self.commands.send(Command::Shutdown), "shutdown command");
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("engine thread panicked");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::preview::Preview;
    use pixelflow_compute::raster::gray_from_fn;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn chart_project(values: &str) -> Project {
        Project::from_json(&format!(
            r#"{{"graphs": [{{"name": "Main", "isMain": true, "nodeGroup": {{
                "nodes": [{{"id": "chart", "type": "chart-viewer", "properties": {{"values": {values}}}}}]
            }}}}]}}"#
        ))
        .unwrap()
    }

    /// Events up to and including the next result.
    fn until_result(service: &EngineService) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = service.recv_timeout(TIMEOUT) {
            let done = matches!(event, Event::Previews { .. } | Event::Failed { .. });
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[test]
    fn previews_carry_generation() {
        let service = EngineService::spawn(EngineConfig::default());
        service.send_project(chart_project("[1, 2, 3]"), 7);
        let events = until_result(&service);
        assert_eq!(events.first(), Some(&Event::ProgressStarted));
        assert!(events.contains(&Event::ProgressEnded));
        let Some(Event::Previews {
            generation,
            previews,
        }) = events.last()
        else {
            unreachable!("no previews in {events:?}");
        };
        assert_eq!(*generation, 7);
        assert!(matches!(previews.get("chart"), Some(Preview::Chart(_))));
    }

    #[test]
    fn failures_carry_generation() {
        let service = EngineService::spawn(EngineConfig::default());
        service.send_project(Project::default(), 3);
        let events = until_result(&service);
        assert!(matches!(
            events.last(),
            Some(Event::Failed { generation: 3, .. })
        ));
    }

    #[test]
    fn viewer_is_published_with_catalog_image() {
        let service = EngineService::spawn(EngineConfig::default());
        service.send_catalog(vec![CatalogImage::new(
            "page",
            gray_from_fn(4, 4, |_, _| 0),
        )]);
        let project = Project::from_json(
            r#"{"graphs": [{"name": "Main", "isMain": true, "nodeGroup": {
                "nodes": [
                    {"id": "src", "type": "image-input", "properties": {"name": "page"}},
                    {"id": "view", "type": "viewer"}
                ],
                "connections": [
                    {"from": {"node": "src", "property": "image"}, "to": {"node": "view", "property": "image"}}
                ]
            }}]}"#,
        )
        .unwrap();
        service.send_project(project, 1);
        let events = until_result(&service);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, Event::Viewer(model) if model.image.width() == 4))
        );
    }

    #[test]
    fn batch_keeps_latest_project_and_catalog() {
        let (tx, rx) = channel();
        let token = CancelToken::new();
        for generation in 1..=3 {
            tx.send(Command::Project {
                project: chart_project("[1]"),
                generation,
            })
            .unwrap();
        }
        tx.send(Command::Catalog(Vec::new())).unwrap();
        tx.send(Command::Catalog(vec![CatalogImage::new("a", gray_from_fn(1, 1, |_, _| 0))]))
            .unwrap();

        let batch = next_batch(&rx, &token).unwrap();
        assert_eq!(batch.project.map(|(_, generation)| generation), Some(3));
        assert_eq!(batch.catalog.as_deref().map(<[CatalogImage]>::len), Some(1));
        assert!(!batch.shutdown);
    }

    #[test]
    fn stale_cancel_is_cleared_when_a_batch_starts() {
        let (tx, rx) = channel();
        let token = CancelToken::new();
        token.cancel();
        tx.send(Command::Project {
            project: chart_project("[1]"),
            generation: 1,
        })
        .unwrap();
        assert!(next_batch(&rx, &token).is_some());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_after_batch_is_collected_stops_the_pass() {
        let (tx, rx) = channel();
        let token = CancelToken::new();
        tx.send(Command::Project {
            project: chart_project("[1, 2]"),
            generation: 1,
        })
        .unwrap();
        let batch = next_batch(&rx, &token).unwrap();
        let (project, _) = batch.project.unwrap();

        // Raised between collecting the batch and running it.
        token.cancel();
        let mut engine = Engine::default();
        let mut globals = crate::globals::MemoryGlobals::default();
        let result = engine.update(
            &project,
            &mut globals,
            &mut crate::globals::NoProgress,
            &token,
        );
        assert!(matches!(result, Err(crate::error::EngineError::Cancelled)));
    }

    #[test]
    fn shutdown_ends_the_batch() {
        let (tx, rx) = channel();
        let token = CancelToken::new();
        tx.send(Command::Shutdown).unwrap();
        tx.send(Command::Project {
            project: chart_project("[1]"),
            generation: 9,
        })
        .unwrap();
        let batch = next_batch(&rx, &token).unwrap();
        assert!(batch.shutdown);
        assert!(batch.project.is_none());

        drop(tx);
        assert!(next_batch(&rx, &token).is_some());
        assert!(next_batch(&rx, &token).is_none());
    }

    #[test]
    fn drop_stops_the_thread() {
        let service = EngineService::spawn(EngineConfig::default());
        service.send_project(chart_project("[1]"), 1);
        drop(service);
    }
}
