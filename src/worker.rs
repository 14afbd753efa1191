use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info};

use crate::geometry::Cell;
use crate::graph::Graph;
use crate::planner::{AlgoResult, AlgorithmSelection, PlannerConfig, run_algorithm, timeout_report};


/// A planning job, the worker owns its copy of the graph
#[derive(Clone, Debug)]
pub struct PlanRequest {
    pub selection: AlgorithmSelection,
    pub graph: Graph,
    pub start: Cell,
    pub goal: Cell,
    pub config: PlannerConfig,
}

/// Events emitted by the worker, in order, for every request
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerEvent {
    /// `completed` of `total` algorithms done, sent before the first run too
    Progress { completed: usize, total: usize },
    Finished(Vec<AlgoResult>),
    /// Some algorithms went over the timeout, `message` lists them
    FinishedWithTimeouts { results: Vec<AlgoResult>, message: String },
    Failed(String),
    /// Results of the algorithms that ran before the cancel was seen
    Cancelled(Vec<AlgoResult>),
}


/// Handle to the planning thread
/// Cancellation is only observed between algorithms, a running solver is bounded by its timeout
pub struct PlanningWorker {
    requests: Option<Sender<PlanRequest>>,
    events: Receiver<WorkerEvent>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlanningWorker {

    /// Spawn the planning thread
    pub fn spawn() -> io::Result<Self> {
        let (request_tx, request_rx) = unbounded::<PlanRequest>();
        let (event_tx, event_rx) = unbounded::<WorkerEvent>();
        let cancel = Arc::new(AtomicBool::new(false));

        let thread_cancel = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name("path-planner".into())
            .spawn(move || run_worker_loop(request_rx, event_tx, thread_cancel))?;

        Ok(Self {
            requests: Some(request_tx),
            events: event_rx,
            cancel,
            handle: Some(handle),
        })
    }

    /// Queue a request; returns false if the worker has stopped
    pub fn submit(&self, request: PlanRequest) -> bool {
        match &self.requests {
            Some(tx) => tx.send(request).is_ok(),
            None => false,
        }
    }

    /// Stop the current or next request before its next algorithm starts
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    /// Finish queued requests, then join the thread
    pub fn shutdown(mut self) -> thread::Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> thread::Result<()> {
        // closing the request channel ends the loop
        self.requests.take();
        match self.handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

impl Drop for PlanningWorker {
    fn drop(&mut self) {
        if self.stop().is_err() {
            error!("planning thread panicked");
        }
    }
}


fn run_worker_loop(requests: Receiver<PlanRequest>, events: Sender<WorkerEvent>, cancel: Arc<AtomicBool>) {
    info!("Planning worker started");

    for request in requests.iter() {
        let event = run_request(&request, &events, &cancel);
        cancel.store(false, Ordering::SeqCst);
        if event.is_none_or(|event| events.send(event).is_err()) {
            debug!("event receiver dropped, stopping worker");
            break;
        }
    }

    info!("Planning worker stopped");
}

/// Run one request, None once nobody listens for events any more
fn run_request(request: &PlanRequest, events: &Sender<WorkerEvent>, cancel: &AtomicBool) -> Option<WorkerEvent> {
    if let Err(e) = request.graph.validate_endpoints(request.start, request.goal) {
        return Some(WorkerEvent::Failed(e.to_string()));
    }

    let algorithms = request.selection.algorithms();
    let total = algorithms.len();
    let mut results = Vec::with_capacity(total);
    events.send(WorkerEvent::Progress { completed: 0, total }).ok()?;

    for (i, algorithm) in algorithms.into_iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            info!("Planning cancelled after {i} of {total} algorithms");
            return Some(WorkerEvent::Cancelled(results));
        }

        match run_algorithm(&request.graph, algorithm, request.start, request.goal, &request.config) {
            Ok(result) => results.push(result),
            Err(e) => return Some(WorkerEvent::Failed(format!("{algorithm}: {e}"))),
        }
        events.send(WorkerEvent::Progress { completed: i + 1, total }).ok()?;
    }

    let message = timeout_report(&results, request.config.timeout);
    if message.is_empty() {
        Some(WorkerEvent::Finished(results))
    } else {
        Some(WorkerEvent::FinishedWithTimeouts { results, message })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::planner::Algorithm;
    use crate::grid::OccupancyGrid;

    const WAIT: Duration = Duration::from_secs(30);

    fn request(selection: AlgorithmSelection, timeout: Duration) -> PlanRequest {
        PlanRequest {
            selection,
            graph: Graph::from_grid(&OccupancyGrid::new(12, 8, 0.05).unwrap()),
            start: Cell::new(0, 0),
            goal: Cell::new(11, 7),
            config: PlannerConfig { timeout, seed: Some(2), ..PlannerConfig::default() },
        }
    }

    #[test]
    fn test_worker_runs_all_algorithms() {
        let worker = PlanningWorker::spawn().unwrap();
        assert!(worker.submit(request(AlgorithmSelection::All, Duration::from_secs(60))));

        for completed in 0..=3 {
            assert_eq!(worker.events().recv_timeout(WAIT).unwrap(), WorkerEvent::Progress { completed, total: 3 });
        }
        match worker.events().recv_timeout(WAIT).unwrap() {
            WorkerEvent::Finished(results) => {
                let algorithms: Vec<Algorithm> = results.iter().map(|r| r.algorithm).collect();
                assert_eq!(algorithms, Algorithm::ALL.to_vec());
            }
            other => panic!("unexpected event {other:?}"),
        }
        worker.shutdown().unwrap();
    }

    #[test]
    fn test_worker_reports_timeouts() {
        let worker = PlanningWorker::spawn().unwrap();
        worker.submit(request(AlgorithmSelection::Single(Algorithm::Bfs), Duration::ZERO));

        let event = worker.events().iter()
            .find(|e| !matches!(e, WorkerEvent::Progress { .. }))
            .unwrap();
        match event {
            WorkerEvent::FinishedWithTimeouts { results, message } => {
                assert_eq!(results.len(), 1);
                assert_eq!(message, "   - BFS Computation exceeded 0 ms\n");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_worker_cancel_before_first_algorithm() {
        let worker = PlanningWorker::spawn().unwrap();
        worker.cancel();
        worker.submit(request(AlgorithmSelection::All, Duration::from_secs(60)));

        assert_eq!(worker.events().recv_timeout(WAIT).unwrap(), WorkerEvent::Progress { completed: 0, total: 3 });
        assert_eq!(worker.events().recv_timeout(WAIT).unwrap(), WorkerEvent::Cancelled(Vec::new()));

        // the flag only covers one request
        worker.submit(request(AlgorithmSelection::Single(Algorithm::AStar), Duration::from_secs(60)));
        let event = worker.events().iter()
            .find(|e| !matches!(e, WorkerEvent::Progress { .. }))
            .unwrap();
        assert!(matches!(event, WorkerEvent::Finished(ref results) if results.len() == 1));
    }

    #[test]
    fn test_worker_rejects_invalid_endpoint() {
        let worker = PlanningWorker::spawn().unwrap();
        let mut req = request(AlgorithmSelection::All, Duration::from_secs(60));
        req.goal = Cell::new(40, 40);
        worker.submit(req);
        match worker.events().recv_timeout(WAIT).unwrap() {
            WorkerEvent::Failed(message) => assert!(message.contains("(40,40)")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_request_stops_when_events_dropped() {
        let (tx, rx) = unbounded();
        drop(rx);
        let cancel = AtomicBool::new(false);
        assert_eq!(run_request(&request(AlgorithmSelection::All, Duration::from_secs(60)), &tx, &cancel), None);
    }

    #[test]
    fn test_worker_stops_after_events_dropped() {
        let (request_tx, request_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        drop(event_rx);
        request_tx.send(request(AlgorithmSelection::All, Duration::from_secs(60))).unwrap();
        request_tx.send(request(AlgorithmSelection::All, Duration::from_secs(60))).unwrap();

        run_worker_loop(request_rx, event_tx, Arc::new(AtomicBool::new(false)));
        // the loop returned with the request channel still open, the second job untouched
        assert_eq!(request_tx.len(), 1);
    }
}
