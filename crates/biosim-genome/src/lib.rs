//! Genomes and the neural networks they encode.
//!
//! A genome is a variable-length list of 32-bit genes, each one a weighted
//! edge from a sensor or internal neuron to an internal neuron or action.
//! The compiler folds gene numbers onto the available nodes, prunes neurons
//! that cannot influence any action and produces a [`NeuralNet`] that is
//! evaluated once per simulation step.

pub mod compiler;
pub mod gene;
pub mod genome;
pub mod mutation;
pub mod net;
pub mod similarity;
pub mod validation;

pub use compiler::{Compiler, CompilerConfig};
pub use gene::{Gene, SinkKind, SourceKind};
pub use genome::Genome;
pub use mutation::Mutator;
pub use net::{ActionLevels, Connection, Edge, NeuralNet, Neuron, Sink, Source};
pub use similarity::{genetic_diversity, genome_similarity};
pub use validation::validate_genome;
