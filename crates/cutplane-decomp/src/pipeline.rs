//! Constraint pipelines: independent contributors of rows to one shared
//! model that read back their own prices after each LP solve.

use cutplane_model::Model;
use cutplane_solver::DualSolution;
use tracing::debug;

use crate::error::DecompError;
use crate::shadow_price::{KeyedRows, ShadowPriceKey, ShadowPriceMap};

/// A contributor of rows and their semantic prices.
///
/// Rows are conventionally named `"<name>_<suffix>_<entity>"` and placed in
/// a constraint group called `name`.
pub trait Pipeline<K: ShadowPriceKey, Q: ?Sized> {
    fn name(&self) -> &str;

    /// Append rows (and objective terms) to `model`, recording every row
    /// under its key in `rows`.
    fn contribute(&mut self, model: &mut Model, rows: &mut KeyedRows<K>)
    -> Result<(), DecompError>;

    /// Price this pipeline attributes to `query`.
    fn extract(&self, map: &ShadowPriceMap<K>, query: &Q) -> f64 {
        let _ = (map, query);
        0.0
    }

    /// Write this pipeline's prices into `map`.
    fn refresh(
        &self,
        map: &mut ShadowPriceMap<K>,
        model: &Model,
        rows: &KeyedRows<K>,
        duals: &DualSolution,
    ) -> Result<(), DecompError> {
        let _ = model;
        rows.refresh(map, duals)
    }
}

struct Registered<K: ShadowPriceKey, Q: ?Sized> {
    pipeline: Box<dyn Pipeline<K, Q>>,
    rows: KeyedRows<K>,
}

/// Ordered set of pipelines over one model.
pub struct PipelineSet<K: ShadowPriceKey, Q: ?Sized> {
    entries: Vec<Registered<K, Q>>,
}

impl<K: ShadowPriceKey, Q: ?Sized> PipelineSet<K, Q> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, pipeline: impl Pipeline<K, Q> + 'static) -> &mut Self {
        self.entries.push(Registered {
            pipeline: Box::new(pipeline),
            rows: KeyedRows::new(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.pipeline.name())
            .collect()
    }

    /// Rows recorded by the named pipeline.
    pub fn rows(&self, name: &str) -> Option<&KeyedRows<K>> {
        self.entries
            .iter()
            .find(|entry| entry.pipeline.name() == name)
            .map(|entry| &entry.rows)
    }

    /// Let every pipeline contribute, in registration order.
    pub fn contribute_all(&mut self, model: &mut Model) -> Result<(), DecompError> {
        for entry in &mut self.entries {
            entry.rows.clear();
            let before = model.num_constraints();
            entry
                .pipeline
                .contribute(model, &mut entry.rows)
                .map_err(|err| wrap(entry.pipeline.name(), err))?;
            debug!(
                component = "shadow_price",
                operation = "contribute",
                status = "success",
                pipeline = entry.pipeline.name(),
                rows = model.num_constraints() - before,
                keys = entry.rows.len(),
                "Pipeline contributed rows"
            );
        }
        Ok(())
    }

    /// Rebuild `map` from the duals of the latest LP solve.
    pub fn refresh_all(
        &self,
        map: &mut ShadowPriceMap<K>,
        model: &Model,
        duals: &DualSolution,
    ) -> Result<(), DecompError> {
        map.clear();
        for entry in &self.entries {
            entry
                .pipeline
                .refresh(map, model, &entry.rows, duals)
                .map_err(|err| wrap(entry.pipeline.name(), err))?;
        }
        debug!(
            component = "shadow_price",
            operation = "refresh_all",
            status = "success",
            pipelines = self.entries.len(),
            prices = map.len(),
            "Refreshed shadow price map"
        );
        Ok(())
    }

    /// Sum of the prices every pipeline attributes to `query`.
    pub fn price(&self, map: &ShadowPriceMap<K>, query: &Q) -> f64 {
        self.entries
            .iter()
            .map(|entry| entry.pipeline.extract(map, query))
            .sum()
    }

    /// Pricing criterion for a candidate column: its cost minus all prices.
    pub fn reduced_cost(&self, map: &ShadowPriceMap<K>, cost: f64, query: &Q) -> f64 {
        cost - self.price(map, query)
    }
}

impl<K: ShadowPriceKey, Q: ?Sized> Default for PipelineSet<K, Q> {
    fn default() -> Self {
        Self::new()
    }
}

fn wrap(pipeline: &str, err: DecompError) -> DecompError {
    match err {
        DecompError::Pipeline { .. } => err,
        other => DecompError::Pipeline {
            pipeline: pipeline.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use cutplane_model::{Bounds, Constraint, Sign, Term, Variable, VariableId};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum Key {
        Task(u32),
        Executor(u32),
    }

    /// A candidate column: one executor covering some tasks.
    struct Column {
        executor: u32,
        tasks: Vec<u32>,
    }

    struct TaskCover {
        tasks: Vec<u32>,
        column: VariableId,
    }

    impl Pipeline<Key, Column> for TaskCover {
        fn name(&self) -> &str {
            "task_cover"
        }

        fn contribute(
            &mut self,
            model: &mut Model,
            rows: &mut KeyedRows<Key>,
        ) -> Result<(), DecompError> {
            for task in &self.tasks {
                let row = Constraint::new(
                    format!("task_cover_demand_{task}"),
                    vec![Term::new(self.column, 1.0)],
                    Sign::GreaterEqual,
                    1.0,
                )
                .in_group("task_cover");
                rows.add_constraint(model, row, Key::Task(*task))?;
            }
            Ok(())
        }

        fn extract(&self, map: &ShadowPriceMap<Key>, query: &Column) -> f64 {
            query
                .tasks
                .iter()
                .map(|task| map.price(&Key::Task(*task)))
                .sum()
        }
    }

    struct ExecutorLimit {
        column: VariableId,
    }

    impl Pipeline<Key, Column> for ExecutorLimit {
        fn name(&self) -> &str {
            "executor"
        }

        fn contribute(
            &mut self,
            model: &mut Model,
            rows: &mut KeyedRows<Key>,
        ) -> Result<(), DecompError> {
            let row = Constraint::new(
                "executor_limit_0",
                vec![Term::new(self.column, 1.0)],
                Sign::LessEqual,
                1.0,
            )
            .in_group("executor");
            rows.add_constraint(model, row, Key::Executor(0))?;
            Ok(())
        }

        fn extract(&self, map: &ShadowPriceMap<Key>, query: &Column) -> f64 {
            map.price(&Key::Executor(query.executor))
        }
    }

    struct Broken;

    impl Pipeline<Key, Column> for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn contribute(&mut self, model: &mut Model, _: &mut KeyedRows<Key>) -> Result<(), DecompError> {
            model.add_constraint(Constraint::new(
                "broken_row",
                vec![Term::new(VariableId::new(99), 1.0)],
                Sign::LessEqual,
                0.0,
            ))?;
            Ok(())
        }
    }

    fn base_model() -> (Model, VariableId) {
        let mut model = Model::new("restricted_master");
        let column = model
            .add_variable(Variable::continuous("lambda_0", Bounds::non_negative()))
            .unwrap();
        (model, column)
    }

    #[test]
    fn test_refresh_follows_contribution_for_any_order() {
        let orders: [Vec<u32>; 3] = [vec![1, 2, 3], vec![3, 1, 2], vec![2, 3, 1]];
        for tasks in orders {
            let (mut model, column) = base_model();
            let mut set: PipelineSet<Key, Column> = PipelineSet::new();
            set.push(TaskCover {
                tasks: tasks.clone(),
                column,
            });
            set.contribute_all(&mut model).unwrap();

            let duals: Vec<f64> = (0..tasks.len()).map(|idx| 10.0 + idx as f64).collect();
            let mut map = ShadowPriceMap::new();
            set.refresh_all(&mut map, &model, &DualSolution::new(duals.clone()))
                .unwrap();
            for (idx, task) in tasks.iter().enumerate() {
                assert_eq!(map.price(&Key::Task(*task)), duals[idx]);
            }
        }
    }

    #[test]
    fn test_prices_are_additive_across_pipelines() {
        let (mut model, column) = base_model();
        let mut set: PipelineSet<Key, Column> = PipelineSet::new();
        set.push(TaskCover {
            tasks: vec![1, 2],
            column,
        })
        .push(ExecutorLimit { column });
        set.contribute_all(&mut model).unwrap();
        assert_eq!(set.names(), vec!["task_cover", "executor"]);
        assert_eq!(model.constraint_group("executor"), Some(2..3));
        assert_eq!(set.rows("executor").map(KeyedRows::len), Some(1));

        let mut map = ShadowPriceMap::new();
        map.put(crate::shadow_price::ShadowPrice::new(Key::Task(9), 100.0));
        set.refresh_all(&mut map, &model, &DualSolution::new(vec![2.0, 3.0, -1.0]))
            .unwrap();
        assert_eq!(map.get(&Key::Task(9)), None);

        let candidate = Column {
            executor: 0,
            tasks: vec![1, 2],
        };
        assert_eq!(set.price(&map, &candidate), 4.0);
        assert_eq!(set.reduced_cost(&map, 6.0, &candidate), 2.0);
    }

    #[test]
    fn test_contribute_failure_names_pipeline() {
        let (mut model, _) = base_model();
        let mut set: PipelineSet<Key, Column> = PipelineSet::new();
        set.push(Broken);
        let err = set.contribute_all(&mut model).unwrap_err();
        match err {
            DecompError::Pipeline { pipeline, .. } => assert_eq!(pipeline, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
