pub mod ingest;
pub mod types;

pub use ingest::{
    load_excluded_members, load_inputs, read_records, read_records_file, CsvRecord, InputPaths,
    CUSTOMERS_FILE, DELINQUENCIES_FILE, DETAILS_FILE, EXCLUDED_FILE, LOANS_FILE, REPAYMENTS_FILE,
};
pub use types::{
    CustomerRecord, DefaulterDelinquencyRecord, DefaulterDetailRecord, ExcludedMemberRecord,
    LoanRecord, MemberKeyed, RepaymentRecord, ScoredAccount,
};
