// Comprehensive tests for the solver crate

#[cfg(test)]
mod tests {
    use crate::*;
    use nalgebra::{DMatrix, DVector};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn solver(backend: BackendKind) -> QpSolver {
        QpSolver::new(
            SolverConfig::default().with_backend(backend),
            Arc::new(SolveStats::new()),
        )
        .unwrap()
    }

    /// Largest violation of primal feasibility, stationarity and complementarity
    fn kkt_violation(qp: &QuadraticProgram, solution: &QpSolution) -> f64 {
        let x = DVector::from_column_slice(&solution.x);
        let m = solution.multipliers.as_ref().unwrap();
        let mut worst: f64 = 0.0;

        let mut residual = qp.gradient(&x);
        if let Some(c) = qp.constraints() {
            let ax = c.a() * &x;
            for i in 0..c.num_rows() {
                let slack = ax[i] - c.b()[i];
                worst = worst.max(-slack).max((m.constraints[i] * slack).abs());
                residual -= c.a().row(i).transpose() * m.constraints[i];
            }
        }
        for j in 0..qp.num_vars() {
            worst = worst.max(qp.lb()[j] - x[j]).max(x[j] - qp.ub()[j]);
            if m.lower[j] > 0.0 {
                worst = worst.max((m.lower[j] * (x[j] - qp.lb()[j])).abs());
            }
            if m.upper[j] > 0.0 {
                worst = worst.max((m.upper[j] * (qp.ub()[j] - x[j])).abs());
            }
            residual[j] += m.upper[j] - m.lower[j];
        }
        worst.max(residual.amax())
    }

    /// Random strictly convex QP whose rows are satisfied by a known interior point
    fn feasible_qp() -> impl Strategy<Value = QuadraticProgram> {
        (
            prop::collection::vec(-2.0..2.0f64, 9),
            prop::collection::vec(-5.0..5.0f64, 3),
            prop::collection::vec(-1.0..1.0f64, 6),
            prop::collection::vec(-1.0..1.0f64, 3),
            prop::collection::vec(0.0..1.0f64, 2),
        )
            .prop_map(|(b, f, a, x0, slack)| {
                let b = DMatrix::from_row_slice(3, 3, &b);
                let h = b.transpose() * &b + DMatrix::identity(3, 3);
                let a = DMatrix::from_row_slice(2, 3, &a);
                let x0 = DVector::from_vec(x0);
                let rhs = &a * &x0 - DVector::from_vec(slack);
                QuadraticProgram::new(
                    h,
                    DVector::from_vec(f),
                    Some(LinearConstraints::new(a, rhs).unwrap()),
                    DVector::from_element(3, -2.0),
                    DVector::from_element(3, 2.0),
                )
                .unwrap()
            })
    }

    /// Random PSD QP with rank-deficient H; the third coordinate enters only linearly
    fn singular_qp() -> impl Strategy<Value = QuadraticProgram> {
        (
            prop::collection::vec(-2.0..2.0f64, 4),
            prop::collection::vec(-5.0..5.0f64, 3),
            prop::collection::vec(-1.0..1.0f64, 6),
            prop::collection::vec(-1.0..1.0f64, 3),
            prop::collection::vec(0.0..1.0f64, 2),
        )
            .prop_map(|(b, f, a, x0, slack)| {
                let b = DMatrix::from_row_slice(2, 2, &b);
                let mut h = DMatrix::<f64>::zeros(3, 3);
                h.view_mut((0, 0), (2, 2)).copy_from(&(b.transpose() * &b));
                let a = DMatrix::from_row_slice(2, 3, &a);
                let x0 = DVector::from_vec(x0);
                let rhs = &a * &x0 - DVector::from_vec(slack);
                QuadraticProgram::new(
                    h,
                    DVector::from_vec(f),
                    Some(LinearConstraints::new(a, rhs).unwrap()),
                    DVector::from_element(3, -2.0),
                    DVector::from_element(3, 2.0),
                )
                .unwrap()
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn active_set_satisfies_kkt(qp in feasible_qp()) {
            let solution = solver(BackendKind::ActiveSet).solve(&qp);
            prop_assert_eq!(solution.status, QpStatus::Optimal);
            prop_assert!(kkt_violation(&qp, &solution) < 1e-7);
        }

        #[test]
        fn interior_point_satisfies_kkt(qp in feasible_qp()) {
            let solution = solver(BackendKind::InteriorPoint).solve(&qp);
            prop_assert_eq!(solution.status, QpStatus::Optimal);
            prop_assert!(kkt_violation(&qp, &solution) < 1e-4);
        }

        #[test]
        fn backends_agree(qp in feasible_qp()) {
            let a = solver(BackendKind::ActiveSet).solve(&qp);
            let b = solver(BackendKind::InteriorPoint).solve(&qp);
            for (xa, xb) in a.x.iter().zip(b.x.iter()) {
                prop_assert!((xa - xb).abs() < 1e-4, "active-set {:?} vs interior-point {:?}", a.x, b.x);
            }
        }

        #[test]
        fn repeated_solves_are_bit_identical(qp in feasible_qp()) {
            for backend in [BackendKind::ActiveSet, BackendKind::InteriorPoint] {
                let s = solver(backend);
                let first = s.solve(&qp);
                let second = s.solve(&qp);
                prop_assert_eq!(first.status, second.status);
                let bits = |x: &[f64]| x.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
                prop_assert_eq!(bits(&first.x), bits(&second.x));
            }
        }

        #[test]
        fn scaling_objective_keeps_minimizer(qp in feasible_qp(), scale in 0.1..10.0f64) {
            let scaled = QuadraticProgram::new(
                qp.h() * scale,
                qp.f() * scale,
                qp.constraints().cloned(),
                qp.lb().clone(),
                qp.ub().clone(),
            )
            .unwrap();
            for (backend, tol) in [(BackendKind::ActiveSet, 1e-8), (BackendKind::InteriorPoint, 1e-4)] {
                let s = solver(backend);
                let base = s.solve(&qp);
                let other = s.solve(&scaled);
                prop_assert_eq!(base.status, other.status);
                for (a, b) in base.x.iter().zip(other.x.iter()) {
                    prop_assert!((a - b).abs() < tol, "{}: {:?} vs {:?}", backend, base.x, other.x);
                }
                prop_assert!(
                    (other.objective - scale * base.objective).abs()
                        < 10.0 * tol * (1.0 + base.objective.abs()) * scale
                );
            }
        }

        #[test]
        fn singular_curvature_satisfies_kkt(qp in singular_qp()) {
            // the active-set backend needs a definite H, so this runs on the fallback
            let solution = solver(BackendKind::ActiveSet).solve(&qp);
            prop_assert_eq!(solution.status, QpStatus::Optimal);
            prop_assert!(kkt_violation(&qp, &solution) < 1e-4);
        }

        #[test]
        fn diagonal_box_matches_closed_form(
            h in prop::collection::vec(0.1..10.0f64, 4),
            f in prop::collection::vec(-10.0..10.0f64, 4),
            lb in prop::collection::vec(-3.0..0.0f64, 4),
            width in prop::collection::vec(0.0..3.0f64, 4),
        ) {
            let ub: Vec<f64> = lb.iter().zip(&width).map(|(l, w)| l + w).collect();
            let qp = QuadraticProgram::new(
                DMatrix::from_diagonal(&DVector::from_vec(h.clone())),
                DVector::from_vec(f.clone()),
                None,
                DVector::from_vec(lb.clone()),
                DVector::from_vec(ub.clone()),
            )
            .unwrap();
            let solution = solver(BackendKind::ActiveSet).solve(&qp);
            prop_assert_eq!(solution.status, QpStatus::Optimal);
            for i in 0..4 {
                let expected = (-f[i] / (2.0 * h[i])).max(lb[i]).min(ub[i]);
                prop_assert_eq!(solution.x[i], expected);
            }
            prop_assert!(kkt_violation(&qp, &solution) < 1e-9);
        }
    }

    #[test]
    fn test_box_example() {
        // n=2, H = 2I, f = 0, box [-1, 1]^2  ->  origin
        let qp = QuadraticProgram::new(
            DMatrix::identity(2, 2) * 2.0,
            DVector::zeros(2),
            None,
            DVector::from_element(2, -1.0),
            DVector::from_element(2, 1.0),
        )
        .unwrap();
        for backend in [BackendKind::ActiveSet, BackendKind::InteriorPoint] {
            let solution = solver(backend).solve(&qp);
            assert_eq!(solution.status, QpStatus::Optimal);
            assert_eq!(solution.x, vec![0.0, 0.0]);
            assert_eq!(solution.objective, 0.0);
        }
    }

    #[test]
    fn test_asymmetric_curvature_backends_agree() {
        // [[1, 2], [0, 1]] has the quadratic form of [[1, 1], [1, 1]]: minimum -1 at (1, -1).
        // [[2, 2], [0, 2]] is definite: interior minimum at (1/3, -1/6).
        let cases = [
            ([1.0, 2.0, 0.0, 1.0], [1.0, -1.0], -1.0),
            ([2.0, 2.0, 0.0, 2.0], [1.0 / 3.0, -1.0 / 6.0], -1.0 / 6.0),
        ];
        for (h, expected, objective) in cases {
            let qp = QuadraticProgram::new(
                DMatrix::from_row_slice(2, 2, &h),
                DVector::from_vec(vec![-1.0, 0.0]),
                None,
                DVector::from_element(2, -1.0),
                DVector::from_element(2, 1.0),
            )
            .unwrap();
            for backend in [BackendKind::ActiveSet, BackendKind::InteriorPoint] {
                let solution = solver(backend).solve(&qp);
                assert_eq!(solution.status, QpStatus::Optimal);
                for (x, e) in solution.x.iter().zip(expected.iter()) {
                    assert!((x - e).abs() < 1e-5, "{}: x = {:?}", backend, solution.x);
                }
                assert!((solution.objective - objective).abs() < 1e-5);
                assert!(kkt_violation(&qp, &solution) < 1e-4);
            }
        }
    }

    #[test]
    fn test_one_dimensional_infeasibility() {
        let qp = QuadraticProgram::new(
            DMatrix::identity(1, 1),
            DVector::zeros(1),
            Some(
                LinearConstraints::new(
                    DMatrix::from_row_slice(1, 1, &[1.0]),
                    DVector::from_vec(vec![5.0]),
                )
                .unwrap(),
            ),
            DVector::from_vec(vec![0.0]),
            DVector::from_vec(vec![1.0]),
        )
        .unwrap();
        for backend in [BackendKind::ActiveSet, BackendKind::InteriorPoint] {
            let s = solver(backend);
            assert_eq!(s.solve(&qp).status, QpStatus::Infeasible);
            assert_eq!(s.snapshot(), StatsSnapshot { requests: 1, errors: 1 });
        }
    }

    #[test]
    fn test_absent_and_empty_rows_match() {
        let h = DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 1.0, 2.0]);
        let f = DVector::from_vec(vec![-8.0, 3.0]);
        let lb = DVector::from_element(2, -1.0);
        let ub = DVector::from_element(2, 1.0);

        let absent = QuadraticProgram::new(h.clone(), f.clone(), None, lb.clone(), ub.clone()).unwrap();
        let empty = QuadraticProgram::new(h, f, Some(LinearConstraints::empty(2)), lb, ub).unwrap();
        assert_eq!(absent.num_constraints(), 0);
        assert_eq!(empty.num_constraints(), 0);

        let s = solver(BackendKind::ActiveSet);
        let a = s.solve(&absent);
        let b = s.solve(&empty);
        assert_eq!(a.status, QpStatus::Optimal);
        assert_eq!(a.status, b.status);
        assert_eq!(a.x, b.x);
        assert!(b.multipliers.unwrap().constraints.is_empty());
    }

    #[test]
    fn test_counter_invariant() {
        let stats = Arc::new(SolveStats::new());
        let s = QpSolver::new(SolverConfig::default(), Arc::clone(&stats)).unwrap();

        let good = QuadraticProgram::new(
            DMatrix::identity(1, 1),
            DVector::from_vec(vec![1.0]),
            None,
            DVector::from_vec(vec![-1.0]),
            DVector::from_vec(vec![1.0]),
        )
        .unwrap();
        let bad = QuadraticProgram::new(
            DMatrix::identity(1, 1) * -1.0,
            DVector::from_vec(vec![1.0]),
            None,
            DVector::from_vec(vec![-1.0]),
            DVector::from_vec(vec![1.0]),
        )
        .unwrap();

        for _ in 0..5 {
            s.solve(&good);
        }
        for _ in 0..3 {
            s.solve(&bad);
        }
        assert_eq!(stats.snapshot(), StatsSnapshot { requests: 8, errors: 3 });
    }

    #[test]
    fn test_input_is_not_mutated() {
        let qp = QuadraticProgram::new(
            DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]),
            DVector::from_vec(vec![1.0, -1.0]),
            Some(
                LinearConstraints::new(
                    DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
                    DVector::from_vec(vec![0.5]),
                )
                .unwrap(),
            ),
            DVector::from_element(2, -1.0),
            DVector::from_element(2, 1.0),
        )
        .unwrap();
        let before = qp.clone();
        solver(BackendKind::ActiveSet).solve(&qp);
        solver(BackendKind::InteriorPoint).solve(&qp);
        assert_eq!(qp, before);
    }

    #[test]
    fn test_dimension_mismatch_fails_fast() {
        let result = QuadraticProgram::new(
            DMatrix::identity(1, 1),
            DVector::zeros(2),
            None,
            DVector::zeros(2),
            DVector::zeros(2),
        );
        assert!(matches!(result, Err(sqpdir_types::SqpError::DimensionMismatch(_))));

        let result = QuadraticProgram::new(
            DMatrix::identity(2, 2),
            DVector::zeros(2),
            Some(LinearConstraints::empty(3)),
            DVector::zeros(2),
            DVector::zeros(2),
        );
        assert!(matches!(result, Err(sqpdir_types::SqpError::DimensionMismatch(_))));
    }
}
