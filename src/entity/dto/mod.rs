pub mod device_value_dto;
