//! Real-coded NSGA-II for recoil distribution optimization.
//!
//! Two objectives, both minimized: the area between the simulated and
//! measured energy spectra, and their summed absolute channel difference.
//! Variation is simulated binary crossover plus polynomial mutation over
//! bounded gene vectors; selection is the fast non-dominated sort with
//! crowding-distance tie-breaking of Deb et al. (2002).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Produces the objective pair for a candidate gene vector.
///
/// Production implementations run an external Monte Carlo simulation and
/// compare its spectrum against the measured one; returning `None` marks
/// the candidate as failed and assigns it infinite objectives.
pub trait SpectrumEvaluator: Sync {
    /// Evaluates `genes`, returning `[area, summed difference]`.
    fn evaluate(&self, genes: &[f64]) -> Option<[f64; 2]>;
}

/// One population member.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Bounded decision variables.
    pub genes: Vec<f64>,
    /// Objective values, minimized.
    pub objectives: [f64; 2],
}

impl Solution {
    /// Euclidean norm of the objective vector.
    #[must_use]
    pub fn objective_distance(&self) -> f64 {
        self.objectives[0].hypot(self.objectives[1])
    }
}

/// Optimizer parameters.
#[derive(Debug, Clone)]
pub struct Nsga2Config {
    /// Population size.
    pub pop_size: usize,
    /// Number of generations; the evaluation budget is
    /// `generations * pop_size`.
    pub generations: usize,
    /// Per-gene lower bounds; its length fixes the gene count.
    pub lower: Vec<f64>,
    /// Per-gene upper bounds, same length as `lower`.
    pub upper: Vec<f64>,
    /// Crossover probability.
    pub cross_p: f64,
    /// SBX distribution index.
    pub dis_c: f64,
    /// Mutation probability numerator; each gene mutates with probability
    /// `mut_p / gene_count`.
    pub mut_p: f64,
    /// Polynomial mutation distribution index.
    pub dis_m: f64,
    /// RNG seed; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Nsga2Config {
    /// Config with the conventional variation parameters for the given
    /// bounds.
    #[must_use]
    pub fn new(pop_size: usize, generations: usize, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        Self {
            pop_size,
            generations,
            lower,
            upper,
            cross_p: 0.9,
            dis_c: 20.0,
            mut_p: 1.0,
            dis_m: 20.0,
            seed: None,
        }
    }
}

/// Pareto dominance: `a` is no worse in every objective and strictly
/// better in at least one.
#[must_use]
pub fn dominates(a: &[f64; 2], b: &[f64; 2]) -> bool {
    a[0] <= b[0] && a[1] <= b[1] && (a[0] < b[0] || a[1] < b[1])
}

/// Fast non-dominated sort.
///
/// Returns fronts of indices into `objectives`, best first, peeling only
/// until `limit` individuals are covered.
#[must_use]
pub fn fast_nondominated_sort(objectives: &[[f64; 2]], limit: usize) -> Vec<Vec<usize>> {
    let n = objectives.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0_usize; n];

    for p in 0..n {
        for q in (p + 1)..n {
            if dominates(&objectives[p], &objectives[q]) {
                dominated_by[p].push(q);
                domination_count[q] += 1;
            } else if dominates(&objectives[q], &objectives[p]) {
                dominated_by[q].push(p);
                domination_count[p] += 1;
            }
        }
    }
    let first_front: Vec<usize> = (0..n).filter(|&p| domination_count[p] == 0).collect();

    let mut fronts = vec![first_front];
    let mut covered = fronts[0].len();
    while covered < limit {
        let mut next = Vec::new();
        for &p in &fronts[fronts.len() - 1] {
            for &q in &dominated_by[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        covered += next.len();
        fronts.push(next);
    }
    fronts
}

/// Crowding distance of each member of one front.
///
/// Boundary members get `INFINITY`; interior members accumulate the
/// normalized gap between their neighbours per objective. Objectives with
/// zero spread contribute nothing.
#[must_use]
pub fn crowding_distance(front: &[[f64; 2]]) -> Vec<f64> {
    let n = front.len();
    let mut distance = vec![0.0_f64; n];
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }
    for obj in 0..2 {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| front[a][obj].total_cmp(&front[b][obj]));
        distance[order[0]] = f64::INFINITY;
        distance[order[n - 1]] = f64::INFINITY;
        let spread = front[order[n - 1]][obj] - front[order[0]][obj];
        if spread <= 0.0 || !spread.is_finite() {
            continue;
        }
        for w in order.windows(3) {
            let gap = (front[w[2]][obj] - front[w[0]][obj]) / spread;
            if distance[w[1]].is_finite() {
                distance[w[1]] += gap;
            }
        }
    }
    distance
}

/// The optimizer. Holds the configuration; each [`Nsga2::run`] call owns
/// its own RNG stream.
#[derive(Debug, Clone)]
pub struct Nsga2 {
    config: Nsga2Config,
}

impl Nsga2 {
    /// Creates an optimizer for `config`.
    #[must_use]
    pub fn new(config: Nsga2Config) -> Self {
        Self { config }
    }

    /// Runs the full generational loop and returns the final first front.
    pub fn run(&self, evaluator: &dyn SpectrumEvaluator) -> Vec<Solution> {
        let cfg = &self.config;
        let mut rng = match cfg.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let mut population: Vec<Solution> = (0..cfg.pop_size)
            .map(|_| {
                let genes: Vec<f64> = cfg
                    .lower
                    .iter()
                    .zip(&cfg.upper)
                    .map(|(&lo, &hi)| rng.gen_range(lo..=hi))
                    .collect();
                Solution {
                    genes,
                    objectives: [f64::INFINITY; 2],
                }
            })
            .collect();
        evaluate(&mut population, evaluator);

        for _ in 1..cfg.generations {
            let (ranks, crowding) = rank_population(&population);
            let mut offspring = Vec::with_capacity(cfg.pop_size);
            while offspring.len() < cfg.pop_size {
                let p1 = tournament(&mut rng, &ranks, &crowding);
                let p2 = tournament(&mut rng, &ranks, &crowding);
                let (c1, c2) = self.crossover(
                    &mut rng,
                    &population[p1].genes,
                    &population[p2].genes,
                );
                for mut genes in [c1, c2] {
                    if offspring.len() >= cfg.pop_size {
                        break;
                    }
                    self.mutate(&mut rng, &mut genes);
                    offspring.push(Solution {
                        genes,
                        objectives: [f64::INFINITY; 2],
                    });
                }
            }
            evaluate(&mut offspring, evaluator);
            population.extend(offspring);
            population = environmental_select(population, cfg.pop_size);
        }

        let objectives: Vec<[f64; 2]> = population.iter().map(|s| s.objectives).collect();
        let fronts = fast_nondominated_sort(&objectives, population.len());
        let mut keep: Vec<bool> = vec![false; population.len()];
        for &i in &fronts[0] {
            keep[i] = true;
        }
        population
            .into_iter()
            .zip(keep)
            .filter_map(|(s, k)| k.then_some(s))
            .collect()
    }

    /// Simulated binary crossover of two parents, bounded per gene.
    fn crossover(&self, rng: &mut StdRng, p1: &[f64], p2: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let cfg = &self.config;
        let mut c1 = p1.to_vec();
        let mut c2 = p2.to_vec();
        if rng.gen::<f64>() > cfg.cross_p {
            return (c1, c2);
        }
        let exponent = 1.0 / (cfg.dis_c + 1.0);
        for i in 0..c1.len() {
            if rng.gen::<f64>() > 0.5 || (p1[i] - p2[i]).abs() < 1e-14 {
                continue;
            }
            let (y1, y2) = if p1[i] < p2[i] {
                (p1[i], p2[i])
            } else {
                (p2[i], p1[i])
            };
            let (yl, yu) = (cfg.lower[i], cfg.upper[i]);
            let u: f64 = rng.gen();

            let spread = |beta: f64| {
                let alpha = 2.0 - beta.powf(-(cfg.dis_c + 1.0));
                if u <= 1.0 / alpha {
                    (u * alpha).powf(exponent)
                } else {
                    (1.0 / (2.0 - u * alpha)).powf(exponent)
                }
            };
            let betaq1 = spread(1.0 + 2.0 * (y1 - yl) / (y2 - y1));
            let betaq2 = spread(1.0 + 2.0 * (yu - y2) / (y2 - y1));
            let mut ch1 = 0.5 * ((y1 + y2) - betaq1 * (y2 - y1));
            let mut ch2 = 0.5 * ((y1 + y2) + betaq2 * (y2 - y1));
            ch1 = ch1.clamp(yl, yu);
            ch2 = ch2.clamp(yl, yu);
            if rng.gen::<f64>() < 0.5 {
                std::mem::swap(&mut ch1, &mut ch2);
            }
            c1[i] = ch1;
            c2[i] = ch2;
        }
        (c1, c2)
    }

    /// Polynomial mutation, each gene with probability `mut_p / gene_count`.
    fn mutate(&self, rng: &mut StdRng, genes: &mut [f64]) {
        let cfg = &self.config;
        #[allow(clippy::cast_precision_loss)]
        let per_gene = cfg.mut_p / genes.len() as f64;
        let mut_pow = 1.0 / (cfg.dis_m + 1.0);
        for (i, gene) in genes.iter_mut().enumerate() {
            if rng.gen::<f64>() >= per_gene {
                continue;
            }
            let (yl, yu) = (cfg.lower[i], cfg.upper[i]);
            let range = yu - yl;
            if range <= 0.0 {
                continue;
            }
            let y = *gene;
            let delta1 = (y - yl) / range;
            let delta2 = (yu - y) / range;
            let r: f64 = rng.gen();
            let deltaq = if r < 0.5 {
                let xy = 1.0 - delta1;
                let val = 2.0 * r + (1.0 - 2.0 * r) * xy.powf(cfg.dis_m + 1.0);
                val.powf(mut_pow) - 1.0
            } else {
                let xy = 1.0 - delta2;
                let val = 2.0 * (1.0 - r) + 2.0 * (r - 0.5) * xy.powf(cfg.dis_m + 1.0);
                1.0 - val.powf(mut_pow)
            };
            *gene = (y + deltaq * range).clamp(yl, yu);
        }
    }
}

fn evaluate(population: &mut [Solution], evaluator: &dyn SpectrumEvaluator) {
    population.par_iter_mut().for_each(|solution| {
        solution.objectives = evaluator
            .evaluate(&solution.genes)
            .unwrap_or([f64::INFINITY; 2]);
    });
}

/// Ranks and crowding distances of a whole population.
fn rank_population(population: &[Solution]) -> (Vec<usize>, Vec<f64>) {
    let objectives: Vec<[f64; 2]> = population.iter().map(|s| s.objectives).collect();
    let fronts = fast_nondominated_sort(&objectives, population.len());
    let mut ranks = vec![usize::MAX; population.len()];
    let mut crowding = vec![0.0; population.len()];
    for (rank, front) in fronts.iter().enumerate() {
        let front_objs: Vec<[f64; 2]> = front.iter().map(|&i| objectives[i]).collect();
        let distances = crowding_distance(&front_objs);
        for (&i, d) in front.iter().zip(distances) {
            ranks[i] = rank;
            crowding[i] = d;
        }
    }
    (ranks, crowding)
}

/// Binary tournament on (rank, crowding); the two contestants may be the
/// same individual.
fn tournament(rng: &mut StdRng, ranks: &[usize], crowding: &[f64]) -> usize {
    let a = rng.gen_range(0..ranks.len());
    let b = rng.gen_range(0..ranks.len());
    if ranks[a] < ranks[b] || (ranks[a] == ranks[b] && crowding[a] > crowding[b]) {
        a
    } else {
        b
    }
}

/// Keeps the best `target` of a merged parent+offspring population,
/// filling whole fronts and breaking the boundary front by crowding.
fn environmental_select(population: Vec<Solution>, target: usize) -> Vec<Solution> {
    let objectives: Vec<[f64; 2]> = population.iter().map(|s| s.objectives).collect();
    let fronts = fast_nondominated_sort(&objectives, target);
    let mut chosen: Vec<usize> = Vec::with_capacity(target);
    for front in fronts {
        if chosen.len() + front.len() <= target {
            chosen.extend(front);
        } else {
            let front_objs: Vec<[f64; 2]> = front.iter().map(|&i| objectives[i]).collect();
            let distances = crowding_distance(&front_objs);
            let mut order: Vec<usize> = (0..front.len()).collect();
            order.sort_by(|&a, &b| distances[b].total_cmp(&distances[a]));
            for &k in order.iter().take(target - chosen.len()) {
                chosen.push(front[k]);
            }
        }
        if chosen.len() >= target {
            break;
        }
    }
    let mut keep = vec![false; population.len()];
    for &i in &chosen {
        keep[i] = true;
    }
    population
        .into_iter()
        .zip(keep)
        .filter_map(|(s, k)| k.then_some(s))
        .collect()
}

/// Picks the three report solutions from a first front: the minimum-area
/// member, the median by objective distance and the minimum-distance
/// member.
#[must_use]
pub fn pick_final_solutions(front: &[Solution]) -> Option<[Solution; 3]> {
    if front.is_empty() {
        return None;
    }
    let min_area = front
        .iter()
        .min_by(|a, b| a.objectives[0].total_cmp(&b.objectives[0]))?;
    let mut by_distance: Vec<&Solution> = front.iter().collect();
    by_distance.sort_by(|a, b| a.objective_distance().total_cmp(&b.objective_distance()));
    let median = by_distance[by_distance.len() / 2];
    let min_distance = by_distance[0];
    Some([min_area.clone(), median.clone(), min_distance.clone()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominance_is_strict_somewhere() {
        assert!(dominates(&[1.0, 1.0], &[2.0, 2.0]));
        assert!(dominates(&[1.0, 2.0], &[1.0, 3.0]));
        assert!(!dominates(&[1.0, 2.0], &[1.0, 2.0]));
        assert!(!dominates(&[1.0, 3.0], &[2.0, 2.0]));
    }

    #[test]
    fn sort_peels_known_fronts() {
        let objectives = [
            [1.0, 4.0],
            [4.0, 1.0],
            [2.0, 2.0],
            [3.0, 3.0],
            [5.0, 5.0],
        ];
        let fronts = fast_nondominated_sort(&objectives, objectives.len());
        assert_eq!(fronts[0], vec![0, 1, 2]);
        assert_eq!(fronts[1], vec![3]);
        assert_eq!(fronts[2], vec![4]);
    }

    #[test]
    fn first_front_is_mutually_nondominated() {
        let objectives: Vec<[f64; 2]> = (0..20)
            .map(|i| {
                let x = f64::from(i) / 4.0;
                [x * x, (x - 2.0) * (x - 2.0)]
            })
            .collect();
        let fronts = fast_nondominated_sort(&objectives, objectives.len());
        for &a in &fronts[0] {
            for &b in &fronts[0] {
                assert!(!dominates(&objectives[a], &objectives[b]));
            }
        }
    }

    #[test]
    fn crowding_boundaries_are_infinite() {
        let front = [[0.0, 4.0], [1.0, 2.0], [2.0, 1.0], [4.0, 0.0]];
        let d = crowding_distance(&front);
        assert!(d[0].is_infinite());
        assert!(d[3].is_infinite());
        assert!(d[1].is_finite() && d[1] > 0.0);
        assert!(d[2].is_finite() && d[2] > 0.0);
    }

    struct Schaffer;

    impl SpectrumEvaluator for Schaffer {
        fn evaluate(&self, genes: &[f64]) -> Option<[f64; 2]> {
            let x = genes[0];
            Some([x * x, (x - 2.0) * (x - 2.0)])
        }
    }

    #[test]
    fn optimizer_closes_in_on_the_pareto_set() {
        let mut config = Nsga2Config::new(24, 20, vec![-5.0], vec![5.0]);
        config.seed = Some(7);
        let front = Nsga2::new(config).run(&Schaffer);
        assert!(!front.is_empty());
        // The Pareto set of this problem is x in [0, 2].
        for s in &front {
            assert!(s.genes[0] >= -5.0 && s.genes[0] <= 5.0);
            assert!(s.objectives[0].is_finite());
        }
        let best_area = front
            .iter()
            .map(|s| s.objectives[0])
            .fold(f64::INFINITY, f64::min);
        assert!(best_area < 1.0);
    }

    struct AlwaysFails;

    impl SpectrumEvaluator for AlwaysFails {
        fn evaluate(&self, _: &[f64]) -> Option<[f64; 2]> {
            None
        }
    }

    #[test]
    fn failed_evaluations_get_infinite_objectives() {
        let mut config = Nsga2Config::new(8, 2, vec![0.0], vec![1.0]);
        config.seed = Some(1);
        let front = Nsga2::new(config).run(&AlwaysFails);
        assert!(front.iter().all(|s| s.objectives[0].is_infinite()));
    }

    #[test]
    fn final_pick_spans_the_front() {
        let front: Vec<Solution> = [[0.0, 10.0], [1.0, 6.0], [3.0, 3.0], [6.0, 1.0], [10.0, 0.0]]
            .iter()
            .map(|&objectives| Solution {
                genes: vec![0.0],
                objectives,
            })
            .collect();
        let [min_area, median, min_distance] = pick_final_solutions(&front).unwrap();
        assert_eq!(min_area.objectives, [0.0, 10.0]);
        assert_eq!(min_distance.objectives, [3.0, 3.0]);
        // Distances sorted: (3,3) < (1,6) = (6,1) < (0,10) = (10,0).
        assert_eq!(median.objectives, [6.0, 1.0]);
        assert!(pick_final_solutions(&[]).is_none());
    }
}
