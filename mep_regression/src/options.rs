/// Tunable knobs for one evolutionary search.
///
/// The rates are fractions of the population size; each epoch performs
/// `floor(population_size * rate)` of the corresponding operation.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub population_size: usize,
    /// Operation rows per tape (on top of one terminal row per parameter).
    pub operations_size: usize,
    /// Operand slots per operation row.
    pub operands_size: usize,
    pub epochs: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub kill_rate: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            population_size: 200,
            operations_size: 50,
            operands_size: 40,
            epochs: 500,
            crossover_rate: 0.5,
            mutation_rate: 0.15,
            kill_rate: 0.15,
        }
    }
}

impl Options {
    pub(crate) fn crossovers_per_epoch(&self) -> usize {
        (self.population_size as f64 * self.crossover_rate) as usize
    }

    pub(crate) fn mutations_per_epoch(&self) -> usize {
        (self.population_size as f64 * self.mutation_rate) as usize
    }

    pub(crate) fn kills_per_epoch(&self) -> usize {
        (self.population_size as f64 * self.kill_rate) as usize
    }
}
