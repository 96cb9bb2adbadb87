pub mod referral;
pub mod test_match;
