//! Training pipeline
//!
//! Checks a problem/parameter pair, dispatches to the formulation's dual,
//! and assembles one-vs-one decision functions for classification.
//! Support vectors of the result are views into the problem's node buffer.

use crate::core::{KernelType, Result, SVMError, SvmNode, SvmType};
use crate::parameter::SvmParameter;
use crate::problem::Problem;
use crate::solver::qmatrix::{OneClassQ, SvcQ, SvrQ};
use crate::solver::smo::{SMOSolver, SmoConfig, SolutionInfo, SolverVariant};
use crate::solver::trained::{SupportVectors, TrainedModel};
use log::{debug, info, warn};
use std::ops::Range;

/// Validate a problem/parameter pair
///
/// Errors carry the exact text reported to the host.
pub fn check_parameter(
    problem: &Problem,
    param: &SvmParameter,
) -> std::result::Result<(), String> {
    let kernel = param.kernel_type;
    if matches!(
        kernel,
        KernelType::Polynomial | KernelType::Rbf | KernelType::Sigmoid
    ) && param.gamma < 0.0
    {
        return Err("gamma < 0".into());
    }
    if kernel == KernelType::Polynomial && param.degree < 0 {
        return Err("degree of polynomial kernel < 0".into());
    }
    if param.cache_size <= 0.0 {
        return Err("cache_size <= 0".into());
    }
    if param.eps <= 0.0 {
        return Err("eps <= 0".into());
    }

    let svm_type = param.svm_type;
    if matches!(
        svm_type,
        SvmType::CSvc | SvmType::EpsilonSvr | SvmType::NuSvr
    ) && param.c <= 0.0
    {
        return Err("C <= 0".into());
    }
    if matches!(
        svm_type,
        SvmType::NuSvc | SvmType::OneClass | SvmType::NuSvr
    ) && (param.nu <= 0.0 || param.nu > 1.0)
    {
        return Err("nu <= 0 or nu > 1".into());
    }
    if svm_type == SvmType::EpsilonSvr && param.p < 0.0 {
        return Err("p < 0".into());
    }
    if param.nr_weight < 0 {
        return Err("nr_weight < 0".into());
    }
    let nr_weight = param.nr_weight as usize;
    if nr_weight != param.weight_label.len() || nr_weight != param.weight.len() {
        return Err("nr_weight inconsistent with weight arrays".into());
    }
    if param.probability {
        return Err("probability estimates are not supported".into());
    }

    if problem.is_empty() {
        return Err("training data is empty".into());
    }

    if svm_type == SvmType::NuSvc {
        let group = group_classes(problem.labels());
        for i in 0..group.nr_class {
            for j in (i + 1)..group.nr_class {
                let (n1, n2) = (group.count[i], group.count[j]);
                if param.nu * (n1 + n2) as f64 / 2.0 > n1.min(n2) as f64 {
                    return Err("specified nu is infeasible".into());
                }
            }
        }
    }

    if kernel == KernelType::Precomputed {
        for i in 0..problem.rows() {
            let serial = problem.row(i).first().map_or(f64::NAN, |n| n.value);
            // Serial k selects column k, so it must leave room for a kernel value
            if !(serial >= 1.0) || serial as usize >= problem.columns() {
                return Err("Wrong input format: sample_serial_number out of range".into());
            }
        }
    }

    Ok(())
}

/// Train a checked problem/parameter pair
pub fn train(problem: &Problem, param: &SvmParameter) -> Result<TrainedModel> {
    if problem.is_empty() {
        return Err(SVMError::EmptyDataset);
    }

    let mut param = param.clone();
    if param.gamma == 0.0 && problem.columns() > 0 {
        param.gamma = 1.0 / problem.columns() as f64;
        debug!("Resolved gamma to {}", param.gamma);
    }

    let model = if param.svm_type.is_classification() {
        train_classification(problem, param)
    } else {
        train_single(problem, param)
    };

    info!(
        "Trained {:?} model: {} classes, {} support vectors",
        model.param.svm_type,
        model.nr_class,
        model.sv_count()
    );
    Ok(model)
}

/// Range of row `i` inside the problem's node buffer
fn row_range(problem: &Problem, i: usize) -> Range<usize> {
    let start = problem.row_start(i);
    start..start + problem.columns()
}

/// Coefficients and offset of one binary decision function
struct DecisionFunction {
    alpha: Vec<f64>,
    rho: f64,
}

fn train_one(
    rows: Vec<&[SvmNode]>,
    labels: &[f64],
    param: &SvmParameter,
    cp: f64,
    cn: f64,
) -> DecisionFunction {
    let (alpha, si) = match param.svm_type {
        SvmType::CSvc => solve_c_svc(rows, labels, param, cp, cn),
        SvmType::NuSvc => solve_nu_svc(rows, labels, param),
        SvmType::OneClass => solve_one_class(rows, param),
        SvmType::EpsilonSvr => solve_epsilon_svr(rows, labels, param),
        SvmType::NuSvr => solve_nu_svr(rows, labels, param),
    };

    let n_sv = alpha.iter().filter(|a| a.abs() > 0.0).count();
    let n_bsv = alpha
        .iter()
        .zip(labels)
        .filter(|&(a, &y)| {
            let bound = if y > 0.0 {
                si.upper_bound_p
            } else {
                si.upper_bound_n
            };
            a.abs() > 0.0 && a.abs() >= bound
        })
        .count();
    debug!(
        "obj = {}, rho = {}, nSV = {}, nBSV = {}",
        si.obj, si.rho, n_sv, n_bsv
    );

    DecisionFunction { alpha, rho: si.rho }
}

fn signs(labels: &[f64]) -> Vec<i8> {
    labels.iter().map(|&v| if v > 0.0 { 1 } else { -1 }).collect()
}

fn smo_config(param: &SvmParameter, cp: f64, cn: f64) -> SmoConfig {
    SmoConfig {
        cp,
        cn,
        eps: param.eps,
        shrinking: param.shrinking,
    }
}

fn solve_c_svc(
    rows: Vec<&[SvmNode]>,
    labels: &[f64],
    param: &SvmParameter,
    cp: f64,
    cn: f64,
) -> (Vec<f64>, SolutionInfo) {
    let l = rows.len();
    let y = signs(labels);
    let mut alpha = vec![0.0; l];
    let mut q = SvcQ::new(rows, param, &y);
    let si = SMOSolver::solve(
        SolverVariant::Standard,
        smo_config(param, cp, cn),
        &mut q,
        &vec![-1.0; l],
        &y,
        &mut alpha,
    );

    for (a, &yi) in alpha.iter_mut().zip(&y) {
        *a *= f64::from(yi);
    }
    (alpha, si)
}

fn solve_nu_svc(
    rows: Vec<&[SvmNode]>,
    labels: &[f64],
    param: &SvmParameter,
) -> (Vec<f64>, SolutionInfo) {
    let l = rows.len();
    let y = signs(labels);

    // Spread nu * l / 2 over each class
    let mut alpha = vec![0.0; l];
    let mut sum_pos = param.nu * l as f64 / 2.0;
    let mut sum_neg = sum_pos;
    for (a, &yi) in alpha.iter_mut().zip(&y) {
        let remaining = if yi == 1 { &mut sum_pos } else { &mut sum_neg };
        *a = remaining.min(1.0);
        *remaining -= *a;
    }

    let mut q = SvcQ::new(rows, param, &y);
    let mut si = SMOSolver::solve(
        SolverVariant::Nu,
        smo_config(param, 1.0, 1.0),
        &mut q,
        &vec![0.0; l],
        &y,
        &mut alpha,
    );

    let r = si.r;
    debug!("C = {}", 1.0 / r);
    for (a, &yi) in alpha.iter_mut().zip(&y) {
        *a *= f64::from(yi) / r;
    }
    si.rho /= r;
    si.obj /= r * r;
    si.upper_bound_p = 1.0 / r;
    si.upper_bound_n = 1.0 / r;

    (alpha, si)
}

fn solve_one_class(rows: Vec<&[SvmNode]>, param: &SvmParameter) -> (Vec<f64>, SolutionInfo) {
    let l = rows.len();

    // First floor(nu * l) variables at 1, the fractional rest on the next one
    let n = (param.nu * l as f64) as usize;
    let mut alpha = vec![0.0; l];
    for a in alpha.iter_mut().take(n) {
        *a = 1.0;
    }
    if n < l {
        alpha[n] = param.nu * l as f64 - n as f64;
    }

    let mut q = OneClassQ::new(rows, param);
    let si = SMOSolver::solve(
        SolverVariant::Standard,
        smo_config(param, 1.0, 1.0),
        &mut q,
        &vec![0.0; l],
        &vec![1; l],
        &mut alpha,
    );
    (alpha, si)
}

fn solve_epsilon_svr(
    rows: Vec<&[SvmNode]>,
    labels: &[f64],
    param: &SvmParameter,
) -> (Vec<f64>, SolutionInfo) {
    let l = rows.len();
    let mut alpha2 = vec![0.0; 2 * l];
    let mut linear_term = vec![0.0; 2 * l];
    let mut y = vec![1i8; 2 * l];
    for (i, &label) in labels.iter().enumerate() {
        linear_term[i] = param.p - label;
        linear_term[i + l] = param.p + label;
        y[i + l] = -1;
    }

    let mut q = SvrQ::new(rows, param);
    let si = SMOSolver::solve(
        SolverVariant::Standard,
        smo_config(param, param.c, param.c),
        &mut q,
        &linear_term,
        &y,
        &mut alpha2,
    );

    let alpha = (0..l).map(|i| alpha2[i] - alpha2[i + l]).collect();
    (alpha, si)
}

fn solve_nu_svr(
    rows: Vec<&[SvmNode]>,
    labels: &[f64],
    param: &SvmParameter,
) -> (Vec<f64>, SolutionInfo) {
    let l = rows.len();
    let c = param.c;
    let mut alpha2 = vec![0.0; 2 * l];
    let mut linear_term = vec![0.0; 2 * l];
    let mut y = vec![1i8; 2 * l];

    let mut sum = c * param.nu * l as f64 / 2.0;
    for (i, &label) in labels.iter().enumerate() {
        let a = sum.min(c);
        alpha2[i] = a;
        alpha2[i + l] = a;
        sum -= a;

        linear_term[i] = -label;
        linear_term[i + l] = label;
        y[i + l] = -1;
    }

    let mut q = SvrQ::new(rows, param);
    let si = SMOSolver::solve(
        SolverVariant::Nu,
        smo_config(param, c, c),
        &mut q,
        &linear_term,
        &y,
        &mut alpha2,
    );
    debug!("epsilon = {}", -si.r);

    let alpha = (0..l).map(|i| alpha2[i] - alpha2[i + l]).collect();
    (alpha, si)
}

/// One-class and regression: a single decision function over all rows
fn train_single(problem: &Problem, param: SvmParameter) -> TrainedModel {
    let rows = (0..problem.rows()).map(|i| problem.row(i)).collect();
    let f = train_one(rows, problem.labels(), &param, 0.0, 0.0);

    let mut sv_rows = Vec::new();
    let mut sv_coef = Vec::new();
    let mut sv_indices = Vec::new();
    for (i, &alpha) in f.alpha.iter().enumerate() {
        if alpha.abs() > 0.0 {
            sv_rows.push(row_range(problem, i));
            sv_coef.push(alpha);
            sv_indices.push(i + 1);
        }
    }

    TrainedModel {
        param,
        nr_class: 2,
        support_vectors: SupportVectors::Borrowed {
            nodes: problem.nodes().clone(),
            rows: sv_rows,
        },
        sv_coef: vec![sv_coef],
        rho: vec![f.rho],
        label: Vec::new(),
        n_sv: Vec::new(),
        sv_indices,
    }
}

/// Rows grouped by class label
struct GroupInfo {
    nr_class: usize,
    label: Vec<i32>,
    start: Vec<usize>,
    count: Vec<usize>,
    /// `perm[k]` is the problem row placed at grouped position `k`
    perm: Vec<usize>,
}

/// Group rows by integer label, in order of first appearance
///
/// With labels -1 and +1 where -1 appears first, +1 is still put first so
/// positive decision values mean the +1 class.
fn group_classes(labels: &[f64]) -> GroupInfo {
    let mut label: Vec<i32> = Vec::new();
    let mut count: Vec<usize> = Vec::new();
    let mut data_label = Vec::with_capacity(labels.len());

    for &y in labels {
        let this_label = y as i32;
        match label.iter().position(|&lab| lab == this_label) {
            Some(j) => {
                count[j] += 1;
                data_label.push(j);
            }
            None => {
                data_label.push(label.len());
                label.push(this_label);
                count.push(1);
            }
        }
    }

    let nr_class = label.len();
    if nr_class == 2 && label[0] == -1 && label[1] == 1 {
        label.swap(0, 1);
        count.swap(0, 1);
        for class in data_label.iter_mut() {
            *class = 1 - *class;
        }
    }

    let mut start = vec![0usize; nr_class];
    for i in 1..nr_class {
        start[i] = start[i - 1] + count[i - 1];
    }

    let mut perm = vec![0usize; labels.len()];
    let mut next = start.clone();
    for (i, &class) in data_label.iter().enumerate() {
        perm[next[class]] = i;
        next[class] += 1;
    }

    GroupInfo {
        nr_class,
        label,
        start,
        count,
        perm,
    }
}

fn train_classification(problem: &Problem, param: SvmParameter) -> TrainedModel {
    let l = problem.rows();
    let group = group_classes(problem.labels());
    let nr_class = group.nr_class;
    if nr_class == 1 {
        warn!("training data in only one class");
    }

    let x: Vec<&[SvmNode]> = group.perm.iter().map(|&i| problem.row(i)).collect();

    let mut weighted_c = vec![param.c; nr_class];
    for (&wlabel, &wval) in param.weight_label.iter().zip(&param.weight) {
        match group.label.iter().position(|&lab| lab == wlabel) {
            Some(j) => weighted_c[j] *= wval,
            None => warn!("class label {} specified in weight is not found", wlabel),
        }
    }

    // k(k-1)/2 binary problems, class i as +1 against class j as -1
    let mut nonzero = vec![false; l];
    let mut decisions = Vec::with_capacity(nr_class * nr_class.saturating_sub(1) / 2);
    for i in 0..nr_class {
        for j in (i + 1)..nr_class {
            let (si, sj) = (group.start[i], group.start[j]);
            let (ci, cj) = (group.count[i], group.count[j]);

            let mut sub_x = Vec::with_capacity(ci + cj);
            sub_x.extend_from_slice(&x[si..si + ci]);
            sub_x.extend_from_slice(&x[sj..sj + cj]);
            let mut sub_labels = vec![1.0; ci];
            sub_labels.resize(ci + cj, -1.0);

            let f = train_one(sub_x, &sub_labels, &param, weighted_c[i], weighted_c[j]);
            for k in 0..ci {
                nonzero[si + k] |= f.alpha[k].abs() > 0.0;
            }
            for k in 0..cj {
                nonzero[sj + k] |= f.alpha[ci + k].abs() > 0.0;
            }
            decisions.push(f);
        }
    }

    let n_sv: Vec<usize> = (0..nr_class)
        .map(|i| {
            let range = group.start[i]..group.start[i] + group.count[i];
            nonzero[range].iter().filter(|&&nz| nz).count()
        })
        .collect();
    let total_sv: usize = n_sv.iter().sum();
    debug!("Total nSV = {}", total_sv);

    let mut sv_rows = Vec::with_capacity(total_sv);
    let mut sv_indices = Vec::with_capacity(total_sv);
    for (k, &row) in group.perm.iter().enumerate() {
        if nonzero[k] {
            sv_rows.push(row_range(problem, row));
            sv_indices.push(row + 1);
        }
    }

    let mut nz_start = vec![0usize; nr_class];
    for i in 1..nr_class {
        nz_start[i] = nz_start[i - 1] + n_sv[i - 1];
    }

    // Coefficients of class i against j go to row j - 1 for class i's
    // vectors and to row i for class j's vectors
    let mut sv_coef = vec![vec![0.0; total_sv]; nr_class.saturating_sub(1)];
    let mut p = 0;
    for i in 0..nr_class {
        for j in (i + 1)..nr_class {
            let (si, sj) = (group.start[i], group.start[j]);
            let (ci, cj) = (group.count[i], group.count[j]);
            let alpha = &decisions[p].alpha;

            let mut q = nz_start[i];
            for k in 0..ci {
                if nonzero[si + k] {
                    sv_coef[j - 1][q] = alpha[k];
                    q += 1;
                }
            }
            let mut q = nz_start[j];
            for k in 0..cj {
                if nonzero[sj + k] {
                    sv_coef[i][q] = alpha[ci + k];
                    q += 1;
                }
            }
            p += 1;
        }
    }

    TrainedModel {
        param,
        nr_class,
        support_vectors: SupportVectors::Borrowed {
            nodes: problem.nodes().clone(),
            rows: sv_rows,
        },
        sv_coef,
        rho: decisions.iter().map(|d| d.rho).collect(),
        label: group.label,
        n_sv,
        sv_indices,
    }
}
