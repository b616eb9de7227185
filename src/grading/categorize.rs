use std::collections::{BTreeMap, HashMap};

use crate::canvas::types::{Assignment, AssignmentGroup, CategoryId, UNCATEGORIZED_ID};

/// Assignments sharing one category, with the category record they map to.
#[derive(Debug, Clone)]
pub struct CategoryBucket<'a> {
    pub category: AssignmentGroup,
    pub assignments: Vec<&'a Assignment>,
}

/// Partition assignments by category id.
///
/// Assignments with no category, or one that is not among `groups`, land in
/// the synthetic uncategorized bucket. Nothing is filtered out here.
/// Buckets come back ordered by category name, case-insensitively.
pub fn categorize<'a>(
    assignments: &'a [Assignment],
    groups: &[AssignmentGroup],
) -> Vec<CategoryBucket<'a>> {
    let by_id: HashMap<CategoryId, &AssignmentGroup> = groups.iter().map(|g| (g.id, g)).collect();

    let mut partitioned: BTreeMap<CategoryId, Vec<&'a Assignment>> = BTreeMap::new();
    for assignment in assignments {
        let id = assignment
            .assignment_group_id
            .filter(|id| by_id.contains_key(id))
            .unwrap_or(UNCATEGORIZED_ID);
        partitioned.entry(id).or_default().push(assignment);
    }

    let mut buckets: Vec<CategoryBucket<'a>> = partitioned
        .into_iter()
        .map(|(id, assignments)| {
            let category = by_id
                .get(&id)
                .map(|g| (*g).clone())
                .unwrap_or_else(AssignmentGroup::uncategorized);
            CategoryBucket {
                category,
                assignments,
            }
        })
        .collect();

    buckets.sort_by(|a, b| {
        a.category
            .name
            .to_lowercase()
            .cmp(&b.category.name.to_lowercase())
            .then(a.category.id.cmp(&b.category.id))
    });
    buckets
}
