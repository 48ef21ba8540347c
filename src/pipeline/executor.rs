//! Pipeline executor — graph construction and thread-per-stage scheduling.
//!
//! `PipelineBuilder::build` wires every stage to its channels, records the
//! topology and checks it. `Pipeline::run` then:
//! 1. Spawns one named thread per stage, downstream stages first.
//! 2. Drains the event channel until every stage has exited.
//! 3. Joins the threads and reports the root cause of any failure.
//!
//! Shutdown needs no signal. The source drops its sender when exhausted,
//! the gate returns once nothing is in flight, and each stage returns when
//! its inputs close, so disconnection ripples down the graph.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::bridge::{
    event_channel, EdgeSnapshot, EventSender, NodeSnapshot, PipelineEvent, TopologySnapshot,
};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::{EdgeId, NodeId};
use crate::pipeline::node::{StageContext, StageNode};
use crate::pipeline::nodes::{
    AdmissionGateNode, AnalysisKind, AnalysisNode, BrightnessLog, BrightnessNode, BroadcastNode,
    FeedbackNode, InversionNode, JoinNode, MatrixSource, MatrixSourceNode,
};
use crate::pipeline::port::compatible;
use crate::pipeline::report::PipelineReport;
use crossbeam_channel::{bounded, unbounded, Receiver};
use std::any::Any;
use std::io::Write;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Stages and edges collected while building.
#[derive(Default)]
struct StageGraph {
    nodes: Vec<StageNode>,
    topology: TopologySnapshot,
}

impl StageGraph {
    fn add(&mut self, node: StageNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.topology.nodes.push(NodeSnapshot {
            id,
            name: node.name(),
            ports: node.ports().to_vec(),
        });
        self.nodes.push(node);
        id
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> PipelineResult<EdgeId> {
        self.add_edge(from, to, false)
    }

    fn connect_feedback(&mut self, from: NodeId, to: NodeId) -> PipelineResult<EdgeId> {
        self.add_edge(from, to, true)
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId, feedback: bool) -> PipelineResult<EdgeId> {
        let (src, dst) = (&self.nodes[from.index()], &self.nodes[to.index()]);
        let kind = compatible(src.ports(), dst.ports()).ok_or(PipelineError::IncompatiblePorts {
            from: src.name(),
            to: dst.name(),
        })?;

        let id = EdgeId(self.topology.edges.len() as u32);
        self.topology.edges.push(EdgeSnapshot {
            id,
            from_node: from,
            to_node: to,
            kind,
            feedback,
        });
        Ok(id)
    }

    /// Exactly one feedback edge, and the forward edges form a DAG.
    /// Returns the forward topological order.
    fn validate(&self) -> PipelineResult<Vec<usize>> {
        let feedback = self.topology.feedback_edges().count();
        if feedback != 1 {
            return Err(PipelineError::FeedbackEdgeCount(feedback));
        }

        let forward = self
            .topology
            .edges
            .iter()
            .filter(|e| !e.feedback)
            .map(|e| (e.from_node.index(), e.to_node.index()));
        topological_order(self.nodes.len(), forward).ok_or(PipelineError::CycleDetected)
    }
}

/// Kahn's algorithm over `n` nodes. `None` if the edges contain a cycle.
pub fn topological_order(
    n: usize,
    edges: impl IntoIterator<Item = (usize, usize)>,
) -> Option<Vec<usize>> {
    let mut in_degree = vec![0u32; n];
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (from, to) in edges {
        if from < n && to < n {
            adj[from].push(to);
            in_degree[to] += 1;
        }
    }

    let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(node) = queue.pop() {
        order.push(node);
        for &next in &adj[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push(next);
            }
        }
    }

    (order.len() == n).then_some(order)
}

/// Builds a [`Pipeline`] from a validated configuration.
pub struct PipelineBuilder {
    config: PipelineConfig,
    log: Option<BrightnessLog>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, log: None }
    }

    /// Send aggregate values to `writer` instead of `config.log_file`.
    pub fn with_log_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.log = Some(BrightnessLog::from_writer(writer));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Wire the graph:
    ///
    /// ```text
    /// source ─► gate ─► broadcast ─┬─► max ───┐
    ///            ▲                 ├─► equal ─┼─► join ─► broadcast ─┬─► inversion ──┐
    ///            │                 └─► min ───┘                      └─► brightness ─┴─► join ─► feedback
    ///            └──────────────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// Opens (truncates) the log file, so a bad path fails here, before any
    /// stage runs.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config;
        let log = match self.log {
            Some(log) => Some(log),
            None => config
                .log_file
                .as_deref()
                .map(BrightnessLog::create)
                .transpose()?,
        };

        // Rendezvous: the source blocks until the gate takes its offer.
        let (offered_tx, offered_rx) = bounded(0);
        let (admitted_tx, admitted_rx) = unbounded();
        let (decrement_tx, decrement_rx) = unbounded();
        let (max_in_tx, max_in_rx) = unbounded();
        let (equal_in_tx, equal_in_rx) = unbounded();
        let (min_in_tx, min_in_rx) = unbounded();
        let (max_out_tx, max_out_rx) = unbounded();
        let (equal_out_tx, equal_out_rx) = unbounded();
        let (min_out_tx, min_out_rx) = unbounded();
        let (record_tx, record_rx) = unbounded();
        let (inversion_in_tx, inversion_in_rx) = unbounded();
        let (brightness_in_tx, brightness_in_rx) = unbounded();
        let (inversion_done_tx, inversion_done_rx) = unbounded();
        let (brightness_done_tx, brightness_done_rx) = unbounded();
        let (joined_tx, joined_rx) = unbounded();

        let finder = |kind, input, output| {
            StageNode::Analysis(AnalysisNode::new(kind, config.extremum_seed, input, output))
        };

        let mut graph = StageGraph::default();
        let source = graph.add(StageNode::Source(MatrixSourceNode::new(
            MatrixSource::new(config.seed, config.rows, config.cols, config.item_count),
            offered_tx,
        )));
        let gate = graph.add(StageNode::Gate(AdmissionGateNode::new(
            config.max_in_flight,
            offered_rx,
            decrement_rx,
            admitted_tx,
        )));
        let fan_out = graph.add(StageNode::MatrixBroadcast(BroadcastNode::matrices(
            admitted_rx,
            vec![max_in_tx, equal_in_tx, min_in_tx],
        )));
        let max = graph.add(finder(AnalysisKind::Maximum, max_in_rx, max_out_tx));
        let equal = graph.add(finder(
            AnalysisKind::Equal(config.brightness),
            equal_in_rx,
            equal_out_tx,
        ));
        let min = graph.add(finder(AnalysisKind::Minimum, min_in_rx, min_out_tx));
        let join_analyses = graph.add(StageNode::AnalysisJoin(JoinNode::analyses(
            max_out_rx,
            equal_out_rx,
            min_out_rx,
            record_tx,
        )));
        let fan_out_records = graph.add(StageNode::RecordBroadcast(BroadcastNode::records(
            record_rx,
            vec![inversion_in_tx, brightness_in_tx],
        )));
        let inversion = graph.add(StageNode::Inversion(InversionNode::new(
            inversion_in_rx,
            inversion_done_tx,
        )));
        let brightness = graph.add(StageNode::Brightness(BrightnessNode::new(
            brightness_in_rx,
            brightness_done_tx,
            log,
        )));
        let join_completions = graph.add(StageNode::CompletionJoin(JoinNode::completions(
            inversion_done_rx,
            brightness_done_rx,
            joined_tx,
        )));
        let feedback = graph.add(StageNode::Feedback(FeedbackNode::new(
            joined_rx,
            decrement_tx,
        )));

        graph.connect(source, gate)?;
        graph.connect(gate, fan_out)?;
        for analysis in [max, equal, min] {
            graph.connect(fan_out, analysis)?;
            graph.connect(analysis, join_analyses)?;
        }
        graph.connect(join_analyses, fan_out_records)?;
        for branch in [inversion, brightness] {
            graph.connect(fan_out_records, branch)?;
            graph.connect(branch, join_completions)?;
        }
        graph.connect(join_completions, feedback)?;
        graph.connect_feedback(feedback, gate)?;

        let order = graph.validate()?;
        tracing::debug!(
            stages = graph.nodes.len(),
            edges = graph.topology.edges.len(),
            "Pipeline graph validated"
        );

        let (events_tx, events_rx) = event_channel();
        Ok(Pipeline {
            nodes: graph.nodes,
            topology: graph.topology,
            order,
            config,
            events_tx,
            events_rx,
        })
    }
}

/// A wired, not yet running pipeline.
pub struct Pipeline {
    nodes: Vec<StageNode>,
    topology: TopologySnapshot,
    order: Vec<usize>,
    config: PipelineConfig,
    events_tx: EventSender,
    events_rx: Receiver<PipelineEvent>,
}

impl Pipeline {
    pub fn topology(&self) -> &TopologySnapshot {
        &self.topology
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run to quiescence.
    pub fn run(self) -> Result<PipelineReport> {
        self.run_with(|_| {})
    }

    /// Run to quiescence, passing every stage event to `observer` on the
    /// calling thread.
    pub fn run_with(self, mut observer: impl FnMut(&PipelineEvent)) -> Result<PipelineReport> {
        let Pipeline {
            nodes,
            topology,
            order,
            config,
            events_tx,
            events_rx,
        } = self;

        tracing::info!(
            stages = topology.nodes.len(),
            items = config.item_count,
            max_in_flight = config.max_in_flight.get(),
            "Pipeline starting"
        );
        let started = Instant::now();

        let mut slots: Vec<Option<StageNode>> = nodes.into_iter().map(Some).collect();
        let mut handles: Vec<(NodeId, &'static str, JoinHandle<PipelineResult<()>>)> =
            Vec::with_capacity(slots.len());

        // Consumers before producers.
        for &idx in order.iter().rev() {
            let Some(node) = slots[idx].take() else {
                continue;
            };
            let node_id = NodeId(idx as u32);
            let name = node.name();
            let ctx = StageContext::new(node_id, name, events_tx.clone());
            let handle = thread::Builder::new()
                .name(format!("matflow-{name}"))
                .spawn(move || run_stage(node, ctx))
                .map_err(PipelineError::Spawn)?;
            handles.push((node_id, name, handle));
        }
        drop(events_tx);

        let mut report = PipelineReport::default();
        for event in events_rx.iter() {
            report.record(&event);
            observer(&event);
        }

        let mut failures = Vec::new();
        for (node_id, name, handle) in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(e),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(stage = name, "Stage panicked: {}", message);
                    report.stage_failures.push(format!("{name}: {message}"));
                    failures.push(PipelineError::StageFailed {
                        node_id,
                        name,
                        message,
                    });
                }
            }
        }
        report.elapsed = started.elapsed();

        if let Some(root) = root_cause(failures) {
            return Err(root.into());
        }

        if !report.is_balanced() {
            tracing::warn!(?report, "Pipeline finished unbalanced");
        }
        tracing::info!(
            generated = report.generated,
            pulses = report.decrement_pulses,
            peak_in_flight = report.peak_in_flight,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Pipeline quiescent"
        );
        Ok(report)
    }
}

fn run_stage(node: StageNode, ctx: StageContext) -> PipelineResult<()> {
    tracing::trace!(stage = ctx.name, "stage started");
    let outcome = node.run(&ctx);

    match &outcome {
        Ok(()) => ctx.emit(PipelineEvent::StageExited {
            node_id: ctx.node_id,
            name: ctx.name,
        }),
        Err(e) => {
            if e.is_cascade() {
                tracing::warn!(stage = ctx.name, "Stage stopped: {}", e);
            } else {
                tracing::error!(stage = ctx.name, "Stage failed: {}", e);
            }
            ctx.emit(PipelineEvent::StageFailed {
                node_id: ctx.node_id,
                name: ctx.name,
                message: e.to_string(),
            });
        }
    }
    outcome
}

/// The first failure that is not just a reaction to another stage exiting.
fn root_cause(mut failures: Vec<PipelineError>) -> Option<PipelineError> {
    if failures.is_empty() {
        return None;
    }
    let idx = failures.iter().position(|e| !e.is_cascade()).unwrap_or(0);
    Some(failures.swap_remove(idx))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
