use aws_config::meta::region::RegionProviderChain;
use aws_types::SdkConfig;
use log::info;

/// Loads the shared SDK configuration. Credentials come from the standard chain
/// (environment, `AWS_PROFILE` or the `default` profile, instance role).
pub async fn load_sdk_config() -> SdkConfig {
    info!("loading aws config");
    aws_config::from_env()
        .region(RegionProviderChain::default_provider().or_else("us-east-1"))
        .load()
        .await
}

pub fn regional_client(config: &SdkConfig, region: &str) -> aws_sdk_ec2::Client {
    let regional = aws_sdk_ec2::config::Builder::from(config)
        .region(aws_sdk_ec2::Region::new(region.to_owned()))
        .build();
    aws_sdk_ec2::Client::from_conf(regional)
}
