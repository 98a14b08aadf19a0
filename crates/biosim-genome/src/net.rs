//! Compiled neural network and its per-step evaluation.
//!
//! Connections are stored neuron sinks first, then action sinks. One pass per
//! step: neuron accumulators see sensor values and the *previous* outputs of
//! every neuron, all driven neurons then switch to `tanh(accumulator)`, and
//! the action connections read those fresh outputs. Cycles between neurons are
//! therefore broken by one step of delay rather than iterated to a fixed point.

use biosim_core::{Action, Sensor};
use serde::{Deserialize, Serialize};

/// Output held by a neuron that has never been driven.
pub const INITIAL_NEURON_OUTPUT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Sensor(Sensor),
    Neuron(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sink {
    Neuron(u16),
    Action(Action),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source: Source,
    pub sink: Sink,
    pub weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub output: f32,
    /// Has at least one input connection
    pub driven: bool,
}

/// One exported wiring edge, ids like `S_LocX`, `N2`, `A_MoveEast`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub sink: String,
    pub weight: f32,
}

/// Action levels produced by one feed-forward pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionLevels {
    levels: [f32; Action::COUNT],
    driven: [bool; Action::COUNT],
}

impl ActionLevels {
    /// Level of `action`, or `None` when the net has no input for it.
    pub fn get(&self, action: Action) -> Option<f32> {
        self.driven[action.index()].then(|| self.levels[action.index()])
    }

    /// Level of `action`, 0.0 when undriven.
    pub fn level(&self, action: Action) -> f32 {
        self.get(action).unwrap_or(0.0)
    }

    pub fn is_driven(&self, action: Action) -> bool {
        self.driven[action.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Action, f32)> + '_ {
        Action::ALL
            .iter()
            .filter(|a| self.driven[a.index()])
            .map(|&a| (a, self.levels[a.index()]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNet {
    pub(crate) connections: Vec<Connection>,
    pub(crate) neurons: Vec<Neuron>,
    /// Sensors read by at least one connection, ascending
    pub(crate) sensors: Vec<Sensor>,
    pub(crate) driven_actions: [bool; Action::COUNT],
}

impl NeuralNet {
    pub fn empty() -> Self {
        Self {
            connections: Vec::new(),
            neurons: Vec::new(),
            sensors: Vec::new(),
            driven_actions: [false; Action::COUNT],
        }
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn sensors_used(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn drives(&self, action: Action) -> bool {
        self.driven_actions[action.index()]
    }

    /// Return every neuron to its initial output.
    pub fn reset(&mut self) {
        for neuron in &mut self.neurons {
            neuron.output = INITIAL_NEURON_OUTPUT;
        }
    }

    /// Run one step. `sense` is called once for each sensor the net reads.
    pub fn feed_forward<F>(&mut self, mut sense: F) -> ActionLevels
    where
        F: FnMut(Sensor) -> f32,
    {
        let mut sensor_values = [0.0f32; Sensor::COUNT];
        for &sensor in &self.sensors {
            sensor_values[sensor.index()] = sense(sensor);
        }

        let mut accumulators = vec![0.0f32; self.neurons.len()];
        let mut levels = [0.0f32; Action::COUNT];
        let mut neurons_updated = false;

        for conn in &self.connections {
            if !neurons_updated && matches!(conn.sink, Sink::Action(_)) {
                for (neuron, acc) in self.neurons.iter_mut().zip(&accumulators) {
                    if neuron.driven {
                        neuron.output = acc.tanh();
                    }
                }
                neurons_updated = true;
            }

            let input = match conn.source {
                Source::Sensor(sensor) => sensor_values[sensor.index()],
                Source::Neuron(n) => self.neurons[n as usize].output,
            };

            match conn.sink {
                Sink::Neuron(n) => accumulators[n as usize] += input * conn.weight,
                Sink::Action(action) => levels[action.index()] += input * conn.weight,
            }
        }

        ActionLevels {
            levels,
            driven: self.driven_actions,
        }
    }

    /// Wiring as labelled edges for external graph tools.
    pub fn edge_list(&self) -> Vec<Edge> {
        self.connections
            .iter()
            .map(|conn| Edge {
                source: match conn.source {
                    Source::Sensor(s) => format!("S_{}", s.name()),
                    Source::Neuron(n) => format!("N{n}"),
                },
                sink: match conn.sink {
                    Sink::Neuron(n) => format!("N{n}"),
                    Sink::Action(a) => format!("A_{}", a.name()),
                },
                weight: conn.weight,
            })
            .collect()
    }
}

impl Default for NeuralNet {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(connections: Vec<Connection>, neurons: usize) -> NeuralNet {
        let mut driven = vec![false; neurons];
        let mut driven_actions = [false; Action::COUNT];
        let mut sensors = Vec::new();
        for conn in &connections {
            match conn.sink {
                Sink::Neuron(n) => driven[n as usize] = true,
                Sink::Action(a) => driven_actions[a.index()] = true,
            }
            if let Source::Sensor(s) = conn.source {
                sensors.push(s);
            }
        }
        sensors.sort();
        sensors.dedup();
        NeuralNet {
            connections,
            neurons: driven
                .into_iter()
                .map(|driven| Neuron {
                    output: INITIAL_NEURON_OUTPUT,
                    driven,
                })
                .collect(),
            sensors,
            driven_actions,
        }
    }

    #[test]
    fn test_direct_sensor_to_action() {
        let mut nn = net(
            vec![Connection {
                source: Source::Sensor(Sensor::Bias),
                sink: Sink::Action(Action::MoveEast),
                weight: 2.0,
            }],
            0,
        );
        let levels = nn.feed_forward(|_| 1.0);
        assert_eq!(levels.get(Action::MoveEast), Some(2.0));
        assert_eq!(levels.get(Action::MoveWest), None);
        assert_eq!(levels.level(Action::MoveWest), 0.0);
        assert!(nn.drives(Action::MoveEast));
    }

    #[test]
    fn test_only_used_sensors_are_read() {
        let mut nn = net(
            vec![Connection {
                source: Source::Sensor(Sensor::LocX),
                sink: Sink::Action(Action::MoveX),
                weight: 1.0,
            }],
            0,
        );
        let mut calls = Vec::new();
        nn.feed_forward(|s| {
            calls.push(s);
            0.25
        });
        assert_eq!(calls, vec![Sensor::LocX]);
    }

    #[test]
    fn test_self_loop_uses_previous_output() {
        // N0 <- N0 (w=1), N0 <- Bias (w=1), MoveX <- N0 (w=1)
        let mut nn = net(
            vec![
                Connection {
                    source: Source::Neuron(0),
                    sink: Sink::Neuron(0),
                    weight: 1.0,
                },
                Connection {
                    source: Source::Sensor(Sensor::Bias),
                    sink: Sink::Neuron(0),
                    weight: 1.0,
                },
                Connection {
                    source: Source::Neuron(0),
                    sink: Sink::Action(Action::MoveX),
                    weight: 1.0,
                },
            ],
            1,
        );

        let first = nn.feed_forward(|_| 1.0).level(Action::MoveX);
        assert!((first - (1.5f32).tanh()).abs() < 1e-6);

        let second = nn.feed_forward(|_| 1.0).level(Action::MoveX);
        assert!((second - (first + 1.0).tanh()).abs() < 1e-6);

        nn.reset();
        let again = nn.feed_forward(|_| 1.0).level(Action::MoveX);
        assert!((again - first).abs() < 1e-6);
    }

    #[test]
    fn test_undriven_neuron_holds_initial_output() {
        let mut nn = net(
            vec![Connection {
                source: Source::Neuron(0),
                sink: Sink::Action(Action::MoveY),
                weight: 1.0,
            }],
            1,
        );
        nn.neurons[0].driven = false;
        let levels = nn.feed_forward(|_| 0.0);
        assert_eq!(levels.level(Action::MoveY), INITIAL_NEURON_OUTPUT);
    }

    #[test]
    fn test_edge_list_labels() {
        let nn = net(
            vec![
                Connection {
                    source: Source::Sensor(Sensor::LocX),
                    sink: Sink::Neuron(2),
                    weight: 0.5,
                },
                Connection {
                    source: Source::Neuron(2),
                    sink: Sink::Action(Action::MoveEast),
                    weight: -1.0,
                },
            ],
            3,
        );
        let edges = nn.edge_list();
        assert_eq!(edges[0].source, "S_LocX");
        assert_eq!(edges[0].sink, "N2");
        assert_eq!(edges[1].source, "N2");
        assert_eq!(edges[1].sink, "A_MoveEast");
        assert_eq!(edges[1].weight, -1.0);
    }
}
