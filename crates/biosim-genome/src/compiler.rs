//! Compiler from genomes to neural networks.

use crate::gene::{SinkKind, SourceKind};
use crate::genome::Genome;
use crate::net::{Connection, NeuralNet, Neuron, Sink, Source, INITIAL_NEURON_OUTPUT};
use biosim_core::{Action, Sensor};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawSource {
    Sensor(usize),
    Neuron(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawSink {
    Neuron(usize),
    Action(usize),
}

#[derive(Debug, Clone, Copy)]
struct RawConnection {
    source: RawSource,
    sink: RawSink,
    weight: f32,
}

pub struct Compiler {
    config: CompilerConfig,
}

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Internal neurons gene numbers are folded onto
    pub max_neurons: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { max_neurons: 5 }
    }
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Build the wiring for `genome`.
    ///
    /// Source and sink numbers are taken modulo the sensor, neuron and action
    /// counts, neurons with no path to an action are dropped, survivors are
    /// renumbered densely in ascending order, and connections into neurons
    /// precede connections into actions.
    pub fn compile(&self, genome: &Genome) -> NeuralNet {
        let max_neurons = self.config.max_neurons.max(1);
        let raw = self.renumber(genome, max_neurons);
        let kept = Self::reachable_neurons(&raw);

        let remap: BTreeMap<usize, u16> = kept
            .iter()
            .enumerate()
            .map(|(dense, &original)| (original, dense as u16))
            .collect();

        let mut neurons = vec![
            Neuron {
                output: INITIAL_NEURON_OUTPUT,
                driven: false,
            };
            remap.len()
        ];
        let mut sensors = BTreeSet::new();
        let mut driven_actions = [false; Action::COUNT];
        let mut into_neurons = Vec::new();
        let mut into_actions = Vec::new();

        for conn in &raw {
            let source = match conn.source {
                RawSource::Sensor(s) => match Sensor::from_index(s) {
                    Some(sensor) => Source::Sensor(sensor),
                    None => continue,
                },
                RawSource::Neuron(n) => match remap.get(&n) {
                    Some(&dense) => Source::Neuron(dense),
                    None => continue,
                },
            };
            match conn.sink {
                RawSink::Neuron(n) => {
                    let Some(&dense) = remap.get(&n) else { continue };
                    neurons[dense as usize].driven = true;
                    into_neurons.push(Connection {
                        source,
                        sink: Sink::Neuron(dense),
                        weight: conn.weight,
                    });
                }
                RawSink::Action(a) => {
                    let Some(action) = Action::from_index(a) else { continue };
                    driven_actions[action.index()] = true;
                    into_actions.push(Connection {
                        source,
                        sink: Sink::Action(action),
                        weight: conn.weight,
                    });
                }
            }
            if let Source::Sensor(sensor) = source {
                sensors.insert(sensor);
            }
        }

        trace!(
            genes = genome.len(),
            neurons = neurons.len(),
            connections = into_neurons.len() + into_actions.len(),
            "compiled genome"
        );

        into_neurons.extend(into_actions);
        NeuralNet {
            connections: into_neurons,
            neurons,
            sensors: sensors.into_iter().collect(),
            driven_actions,
        }
    }

    fn renumber(&self, genome: &Genome, max_neurons: usize) -> Vec<RawConnection> {
        genome
            .iter()
            .map(|gene| RawConnection {
                source: match gene.source_kind {
                    SourceKind::Sensor => RawSource::Sensor(gene.source_num as usize % Sensor::COUNT),
                    SourceKind::Neuron => RawSource::Neuron(gene.source_num as usize % max_neurons),
                },
                sink: match gene.sink_kind {
                    SinkKind::Action => RawSink::Action(gene.sink_num as usize % Action::COUNT),
                    SinkKind::Neuron => RawSink::Neuron(gene.sink_num as usize % max_neurons),
                },
                weight: gene.weight_as_f32(),
            })
            .collect()
    }

    /// Neurons from which some action is reachable, found by walking
    /// connections backwards from the action sinks.
    fn reachable_neurons(raw: &[RawConnection]) -> BTreeSet<usize> {
        let mut kept: BTreeSet<usize> = raw
            .iter()
            .filter_map(|c| match (c.source, c.sink) {
                (RawSource::Neuron(n), RawSink::Action(_)) => Some(n),
                _ => None,
            })
            .collect();

        let mut frontier: Vec<usize> = kept.iter().copied().collect();
        while let Some(target) = frontier.pop() {
            for conn in raw {
                if let (RawSource::Neuron(n), RawSink::Neuron(sink)) = (conn.source, conn.sink) {
                    if sink == target && kept.insert(n) {
                        frontier.push(n);
                    }
                }
            }
        }
        kept
    }
}
