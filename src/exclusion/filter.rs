use super::types::ExcludedMemberSet;
use crate::records::MemberKeyed;

/// Drop records belonging to excluded members.
/// Returns the kept records and how many were dropped.
pub fn filter_included<'a, T: MemberKeyed>(
    records: &'a [T],
    excluded: &ExcludedMemberSet,
) -> (Vec<&'a T>, usize) {
    let kept: Vec<&'a T> = records
        .iter()
        .filter(|r| !excluded.is_excluded(r.member_id()))
        .collect();
    let dropped = records.len() - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CustomerRecord, LoanRecord};

    fn customer(member_id: &str) -> CustomerRecord {
        CustomerRecord {
            member_id: member_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_included_removes_excluded() {
        let excluded: ExcludedMemberSet = ["m1"].into_iter().collect();
        let customers = vec![customer("m1"), customer("m2")];

        let (kept, dropped) = filter_included(&customers, &excluded);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].member_id, "m2");
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_filter_included_keeps_all_when_empty() {
        let excluded = ExcludedMemberSet::new();
        let customers = vec![customer("m1"), customer("m2")];

        let (kept, dropped) = filter_included(&customers, &excluded);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_filter_applies_to_every_loan_of_member() {
        let excluded: ExcludedMemberSet = ["m1"].into_iter().collect();
        let loans = vec![
            LoanRecord {
                loan_id: "l1".to_string(),
                member_id: "m1".to_string(),
                ..Default::default()
            },
            LoanRecord {
                loan_id: "l2".to_string(),
                member_id: "m1".to_string(),
                ..Default::default()
            },
            LoanRecord {
                loan_id: "l3".to_string(),
                member_id: "m2".to_string(),
                ..Default::default()
            },
        ];

        let (kept, dropped) = filter_included(&loans, &excluded);
        assert_eq!(dropped, 2);
        assert_eq!(kept[0].loan_id, "l3");
    }
}
