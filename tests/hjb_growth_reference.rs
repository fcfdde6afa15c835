use approx::assert_relative_eq;
use ramsey_fd::core::{DiagKey, HjbEngine, SolverError};
use ramsey_fd::engines::hjb::{
    ExogenousBlock, GeneratorMatrix, Grid, GridSpec, ImplicitHjbEngine, UpwindDirection,
    UpwindScheme, ValueIteration, idx, initial_guess,
};
use ramsey_fd::models::{Dynamics, GrowthModel, LogOuProcess, ModelParameters};

fn textbook_parameters() -> ModelParameters {
    ModelParameters::builder()
        .risk_aversion(2.0)
        .discount_rate(0.05)
        .capital_share(1.0 / 3.0)
        .depreciation(0.05)
        .growth_rate(0.0)
        .tfp(1.0)
        .build()
        .expect("valid parameters")
}

fn rbc_model() -> GrowthModel {
    let process = LogOuProcess::from_correlation(0.9, 0.07).expect("valid process");
    GrowthModel::new(textbook_parameters(), Dynamics::Exogenous { process }).expect("valid model")
}

#[test]
fn deterministic_steady_state_matches_closed_form() {
    let model = GrowthModel::deterministic(textbook_parameters()).expect("valid model");
    let closed_form = (1.0_f64 / 3.0 / 0.1).powf(1.5);
    assert_relative_eq!(model.steady_state_capital(), closed_form, max_relative = 1e-12);

    let engine = ImplicitHjbEngine::new(GridSpec::new(200))
        .with_value_iteration(ValueIteration::default().with_max_iterations(200));
    let solution = engine.solve(&model).expect("deterministic solve");
    assert!(solution.is_converged());

    let kss = solution.steady_state_capital(0).expect("drift crosses zero");
    let dk = solution.grid.capital.step();
    assert!(
        (kss - closed_form).abs() <= 2.0 * dk,
        "kss={kss}, closed form={closed_form}, dk={dk}"
    );
}

#[test]
fn deterministic_policy_saves_below_and_dissaves_above_steady_state() {
    let model = GrowthModel::deterministic(textbook_parameters()).expect("valid model");
    let engine = ImplicitHjbEngine::new(GridSpec::new(120))
        .with_value_iteration(ValueIteration::default().with_max_iterations(200));
    let solution = engine.solve(&model).expect("deterministic solve");
    let kss = model.steady_state_capital();
    let k = solution.grid.capital.nodes();
    let dk = solution.grid.capital.step();

    for (i, &ki) in k.iter().enumerate() {
        let drift = solution.policy.drift[i];
        if ki < kss - 2.0 * dk {
            assert!(drift > 0.0, "k={ki} drift={drift}");
            assert_eq!(solution.policy.direction[i], UpwindDirection::Forward);
        } else if ki > kss + 2.0 * dk {
            assert!(drift < 0.0, "k={ki} drift={drift}");
            assert_eq!(solution.policy.direction[i], UpwindDirection::Backward);
        }
    }
}

#[test]
fn uniform_grid_is_evenly_spaced() {
    for (min, max, count) in [(0.1, 10.0, 2), (1.0, 3.0, 7), (0.3, 18.0, 250)] {
        let grid = Grid::uniform(min, max, count).expect("valid grid");
        let nodes = grid.nodes();
        assert_eq!(nodes.len(), count);
        assert_relative_eq!(nodes[0], min);
        assert_relative_eq!(nodes[count - 1], max, max_relative = 1e-12);
        let step = (max - min) / (count - 1) as f64;
        assert_relative_eq!(grid.step(), step, max_relative = 1e-12);
        for w in nodes.windows(2) {
            assert!(w[1] > w[0]);
            assert_relative_eq!(w[1] - w[0], step, max_relative = 1e-9);
        }
    }
}

#[test]
fn degenerate_grids_are_rejected() {
    assert!(matches!(
        Grid::uniform(1.0, 2.0, 1),
        Err(SolverError::InvalidGrid(_))
    ));
    assert!(matches!(
        Grid::uniform(2.0, 1.0, 10),
        Err(SolverError::InvalidGrid(_))
    ));
}

#[test]
fn generator_conserves_probability_in_interior_and_boundary_rows() {
    let model = rbc_model();
    let grid = GridSpec::new(30)
        .with_exogenous_points(8)
        .build(&model)
        .expect("grid builds");
    let value = initial_guess(&model, &grid);
    let policy = UpwindScheme::new(&model, &grid)
        .policy(&value)
        .expect("policy exists");
    let block = ExogenousBlock::new(&model, &grid).expect("block builds");
    let op = GeneratorMatrix::assemble(&model, &grid, &policy, block.as_ref())
        .expect("generator assembles");

    let n_k = grid.n_capital();
    let rows = [
        idx(15, 4, n_k),
        idx(0, 0, n_k),
        idx(n_k - 1, 4, n_k),
        idx(10, 7, n_k),
    ];
    for row in rows {
        let (cl, cu) = op.capital_rates(row);
        let (zl, zu) = op.exogenous_rates(row);
        for rate in [cl, cu, zl, zu] {
            assert!(rate >= 0.0, "row {row}: negative off-diagonal {rate}");
        }
        assert_relative_eq!(op.capital_diagonal(row), -(cl + cu), epsilon = 1e-12);
        assert_relative_eq!(op.exogenous_diagonal(row), -(zl + zu), epsilon = 1e-12);
    }
    assert!(op.max_row_sum() < 1e-9);

    // Capital edges never wrap into the neighbouring exogenous row.
    assert_eq!(op.entry(idx(n_k - 1, 2, n_k), idx(0, 3, n_k)), 0.0);
    assert_eq!(op.entry(idx(0, 3, n_k), idx(n_k - 1, 2, n_k)), 0.0);
}

#[test]
fn rbc_value_increases_with_capital_and_productivity() {
    let model = rbc_model();
    let engine = ImplicitHjbEngine::new(GridSpec::new(50).with_exogenous_points(10))
        .with_value_iteration(ValueIteration::default().with_max_iterations(200));
    let solution = engine.solve(&model).expect("rbc solve");
    assert!(solution.is_converged());

    let n_k = solution.grid.n_capital();
    let n_z = solution.grid.n_exogenous();
    for j in 0..n_z {
        let row = &solution.value[idx(0, j, n_k)..idx(0, j, n_k) + n_k];
        assert!(row.windows(2).all(|w| w[1] > w[0]));
    }
    for i in [0, n_k / 2, n_k - 1] {
        for j in 1..n_z {
            assert!(solution.value[idx(i, j, n_k)] > solution.value[idx(i, j - 1, n_k)]);
        }
    }
}

#[test]
fn fixed_point_is_idempotent_in_two_dimensions() {
    let model = rbc_model();
    let grid = GridSpec::new(40)
        .with_exogenous_points(8)
        .build(&model)
        .expect("grid builds");
    let iteration = ValueIteration::default().with_max_iterations(200);
    let first = iteration.run(&model, &grid, None).expect("first solve");
    assert!(first.is_converged());

    let again = iteration
        .run(&model, &grid, Some(first.value.clone()))
        .expect("second solve");
    assert!(again.distance_history[0] < iteration.tolerance);
}

#[test]
fn capital_grid_past_sustainable_stock_is_a_domain_error() {
    let model = GrowthModel::deterministic(textbook_parameters()).expect("valid model");
    let engine = ImplicitHjbEngine::new(GridSpec::new(40).with_capital_factors(0.3, 50.0));
    assert!(matches!(engine.solve(&model), Err(SolverError::Domain(_))));
}

#[test]
fn capital_diffusion_steady_state_lies_inside_the_grid() {
    for sigma in [0.1, 0.2] {
        let model = GrowthModel::new(
            ModelParameters::default(),
            Dynamics::CapitalDiffusion { sigma },
        )
        .expect("valid model");
        let solution = ImplicitHjbEngine::default().solve(&model).expect("diffusion solve");
        let (k_min, k_max) = (solution.grid.capital.min(), solution.grid.capital.max());

        let kss = solution
            .steady_state_capital(0)
            .expect("drift crosses zero inside the grid");
        assert!(kss > k_min && kss < k_max, "sigma={sigma} kss={kss}");
        assert_eq!(
            solution.diagnostics.get_key(DiagKey::SteadyStateCapital),
            Some(kss)
        );
    }
}
