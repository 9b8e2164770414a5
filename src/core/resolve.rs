use crate::domain::model::{RecipePlan, Requirement};
use crate::utils::error::{Result, SmokeError};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug)]
pub struct ResolvedOrder {
    pub ordered: Vec<RecipePlan>,
    /// 不在本地 recipe 集合內的需求,僅記錄
    pub external: Vec<Requirement>,
}

/// 依需求圖排序 recipe,被依賴者先驗證。
/// 版本採精確比對,衝突與循環都是硬錯誤。
pub fn order_recipes(plans: Vec<RecipePlan>) -> Result<ResolvedOrder> {
    let mut versions: BTreeMap<String, String> = BTreeMap::new();
    for plan in &plans {
        if versions
            .insert(plan.name.clone(), plan.version.clone())
            .is_some()
        {
            return Err(SmokeError::ConfigValidationError {
                field: "recipes".to_string(),
                message: format!("Duplicate recipe for package '{}'", plan.name),
            });
        }
    }

    let mut external_set: BTreeSet<(String, String)> = BTreeSet::new();
    let mut indegree: BTreeMap<String, usize> =
        plans.iter().map(|p| (p.name.clone(), 0)).collect();
    let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for plan in &plans {
        for require in &plan.requires {
            match versions.get(&require.name) {
                Some(found) => {
                    if found != &require.version {
                        return Err(SmokeError::RequirementConflictError {
                            package: plan.name.clone(),
                            required: format!("{}/{}", require.name, require.version),
                            found: format!("{}/{}", require.name, found),
                        });
                    }
                    *indegree.get_mut(&plan.name).unwrap() += 1;
                    dependents
                        .entry(require.name.clone())
                        .or_default()
                        .push(plan.name.clone());
                }
                None => {
                    external_set.insert((require.name.clone(), require.version.clone()));
                }
            }
        }
    }

    let mut by_name: BTreeMap<String, RecipePlan> =
        plans.into_iter().map(|p| (p.name.clone(), p)).collect();

    // Kahn 拓撲排序,同層依名稱排序以保持穩定輸出
    let mut ready: BTreeSet<String> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(name, _)| name.clone())
        .collect();

    let mut ordered = Vec::with_capacity(by_name.len());
    while let Some(name) = ready.iter().next().cloned() {
        ready.remove(&name);
        ordered.push(by_name.remove(&name).expect("ready name must be present"));

        if let Some(next) = dependents.get(&name) {
            for dependent in next {
                let degree = indegree.get_mut(dependent).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent.clone());
                }
            }
        }
    }

    if !by_name.is_empty() {
        let cycle: Vec<String> = by_name.keys().cloned().collect();
        return Err(SmokeError::RequirementCycleError {
            cycle: cycle.join(", "),
        });
    }

    Ok(ResolvedOrder {
        ordered,
        external: external_set
            .into_iter()
            .map(|(name, version)| Requirement { name, version })
            .collect(),
    })
}
