
#[cfg(test)]
mod manager_tests;
#[cfg(test)]
mod metadata_tests;
